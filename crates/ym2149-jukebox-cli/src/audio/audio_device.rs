//! rodio output fed from the sample ring.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rodio::{OutputStream, Sink, Source};

use super::{AudioError, RingBuffer};

/// Samples pulled from the ring per lock.
const BATCH: usize = 1024;

/// rodio source draining a [`RingBuffer`].
///
/// Underruns play silence so the sink never runs dry; the source ends only
/// once `finished` is raised.
struct RingBufferSource {
    ring: Arc<RingBuffer>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    batch: Vec<f32>,
    pos: usize,
    len: usize,
}

impl RingBufferSource {
    fn new(ring: Arc<RingBuffer>, sample_rate: u32, channels: u16, finished: Arc<AtomicBool>) -> Self {
        Self {
            ring,
            sample_rate,
            channels,
            finished,
            batch: vec![0.0; BATCH],
            pos: 0,
            len: 0,
        }
    }
}

impl Iterator for RingBufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }
        if self.pos >= self.len {
            let read = self.ring.read(&mut self.batch);
            if read == 0 {
                self.batch.fill(0.0);
                self.len = self.batch.len();
            } else {
                self.len = read;
            }
            self.pos = 0;
        }
        let sample = self.batch[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Default output device playing whatever the ring holds.
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output and start draining `ring`.
    pub fn new(sample_rate: u32, channels: u16, ring: Arc<RingBuffer>) -> Result<Self, AudioError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| AudioError::Device(e.to_string()))?;

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingBufferSource::new(
            ring,
            sample_rate,
            channels,
            Arc::clone(&finished),
        ));

        Ok(Self {
            _stream: stream,
            sink,
            finished,
        })
    }

    /// Stop pulling samples, keeping the ring contents.
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume pulling samples.
    pub fn play(&self) {
        self.sink.play();
    }

    /// Whether output is paused.
    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    /// End the stream; the source returns `None` from now on.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.sink.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(len: usize) -> Arc<RingBuffer> {
        Arc::new(RingBuffer::new(len).unwrap())
    }

    fn try_device(ring: Arc<RingBuffer>) -> Option<AudioDevice> {
        match AudioDevice::new(44_100, 1, ring) {
            Ok(device) => Some(device),
            Err(err) => {
                eprintln!("Skipping audio_device test (audio backend unavailable): {err}");
                None
            }
        }
    }

    #[test]
    fn test_source_reports_format() {
        let source = RingBufferSource::new(ring(64), 48_000, 2, Arc::new(AtomicBool::new(false)));
        assert_eq!(source.sample_rate(), 48_000);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.total_duration(), None);
    }

    #[test]
    fn test_source_plays_ring_then_silence() {
        let ring = ring(64);
        ring.write(&[0.5, -0.5]);
        let mut source =
            RingBufferSource::new(Arc::clone(&ring), 44_100, 1, Arc::new(AtomicBool::new(false)));

        assert_eq!(source.next(), Some(0.5));
        assert_eq!(source.next(), Some(-0.5));
        assert_eq!(source.next(), Some(0.0));
    }

    #[test]
    fn test_source_ends_when_finished() {
        let finished = Arc::new(AtomicBool::new(false));
        let mut source = RingBufferSource::new(ring(64), 44_100, 1, Arc::clone(&finished));
        assert!(source.next().is_some());

        finished.store(true, Ordering::Relaxed);
        assert_eq!(source.next(), None);
    }

    #[test]
    fn test_device_pause_and_play() {
        let Some(device) = try_device(ring(4096)) else {
            return;
        };
        device.pause();
        assert!(device.is_paused());
        device.play();
        assert!(!device.is_paused());
    }
}

//! Streaming audio output.
//!
//! A producer thread renders replayer samples into a fixed-size [`RingBuffer`];
//! the rodio callback drains it through [`AudioDevice`]. Memory use is bounded
//! by the ring size whatever the track length.

pub mod audio_device;
pub mod realtime;
pub mod ring_buffer;

pub use audio_device::AudioDevice;
pub use realtime::{BufferStats, SampleQueue};
pub use ring_buffer::RingBuffer;

use thiserror::Error;

/// Output sample rate. The AY replayer only renders at this rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Producer back-off when the ring is full, in microseconds.
pub const BUFFER_BACKOFF_MICROS: u64 = 100;

/// Errors from the audio output path.
#[derive(Error, Debug)]
pub enum AudioError {
    /// The ring buffer could not be allocated.
    #[error("ring buffer: {0}")]
    Buffer(String),

    /// No usable output device or sink.
    #[error("audio device: {0}")]
    Device(String),
}

/// Ring buffer and stream format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Ring capacity in samples. Bigger rings survive scheduling hiccups but
    /// delay pause and track changes.
    pub ring_buffer_size: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

impl StreamConfig {
    /// 16384-sample ring (about 372 ms at 44.1 kHz).
    pub fn stable(sample_rate: u32) -> Self {
        Self {
            ring_buffer_size: 16384,
            sample_rate,
            channels: 1,
        }
    }

    /// Time needed to play a full ring.
    pub fn latency_ms(&self) -> f32 {
        self.ring_buffer_size as f32 * 1000.0 / (self.sample_rate as f32 * self.channels as f32)
    }

    /// Number of samples covering `ms` milliseconds of audio.
    pub fn samples_for_ms(&self, ms: u64) -> u64 {
        ms * u64::from(self.sample_rate) * u64::from(self.channels) / 1000
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stable(DEFAULT_SAMPLE_RATE)
    }
}

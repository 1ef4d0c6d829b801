//! Audio output plus the producer thread that feeds it.
//!
//! The producer renders the [`Deck`] in fixed batches and pushes them into the
//! ring buffer; the rodio callback drains the ring on its own thread. After the
//! final batch of a track is written the producer marks it queued on the deck.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::audio::{AudioDevice, AudioError, BufferStats, SampleQueue, StreamConfig};
use crate::engine::deck::Deck;

/// Samples rendered per producer iteration.
const PRODUCER_BATCH: usize = 2048;

/// Producer nap while the deck has nothing to play.
const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Running output stream with its producer thread.
///
/// Dropping the context stops the producer, joins it and ends the stream.
pub struct StreamingContext {
    device: AudioDevice,
    queue: Arc<SampleQueue>,
    running: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl StreamingContext {
    /// Open the default output device and start rendering `deck`.
    pub fn start(deck: Arc<Mutex<Deck>>, config: StreamConfig) -> Result<Self, AudioError> {
        let queue = Arc::new(SampleQueue::new(config)?);
        let device = AudioDevice::new(config.sample_rate, config.channels, queue.buffer())?;
        info!(
            sample_rate = config.sample_rate,
            latency_ms = config.latency_ms(),
            "audio output opened"
        );

        let running = Arc::new(AtomicBool::new(true));
        let producer = thread::Builder::new()
            .name("ym-jukebox-producer".into())
            .spawn({
                let queue = Arc::clone(&queue);
                let running = Arc::clone(&running);
                move || run_producer_loop(&deck, &queue, &running)
            })
            .map_err(|err| AudioError::Device(format!("cannot spawn producer: {err}")))?;

        Ok(Self {
            device,
            queue,
            running,
            producer: Some(producer),
        })
    }

    /// Pause or resume the output device.
    pub fn set_paused(&self, paused: bool) {
        if paused {
            self.device.pause();
        } else {
            self.device.play();
        }
    }

    /// Drop audio queued for the previous track and make sure output runs.
    pub fn restart(&self) {
        self.queue.clear();
        self.device.play();
    }

    /// Whether the device played out everything queued so far.
    pub fn is_drained(&self) -> bool {
        self.queue.is_drained()
    }

    /// Stream counters.
    pub fn stats(&self) -> BufferStats {
        self.queue.stats()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                warn!("producer thread panicked");
            }
        }
        self.device.finish();
        let stats = self.stats();
        debug!(
            samples = stats.samples_written,
            overruns = stats.overrun_count,
            fill = stats.fill_percentage,
            "audio output closed"
        );
    }
}

impl Drop for StreamingContext {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_producer_loop(deck: &Mutex<Deck>, queue: &SampleQueue, running: &AtomicBool) {
    let mut batch = [0.0f32; PRODUCER_BATCH];

    while running.load(Ordering::Relaxed) {
        let (rendered, last, generation) = {
            let mut deck = deck.lock();
            let rendered = deck.render(&mut batch);
            (rendered, deck.track_ended(), deck.generation())
        };
        if !rendered {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        let written = queue.write_blocking(&batch);
        if written < batch.len() {
            debug!(written, "ring buffer overrun");
        }
        if last {
            deck.lock().mark_queued(generation);
        }
    }
}

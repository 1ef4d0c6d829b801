//! Producer side of the stream: back-pressured writes into the ring.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{AudioError, BUFFER_BACKOFF_MICROS, RingBuffer, StreamConfig};

/// Give up on a batch after this many consecutive full-ring back-offs
/// (about 100 ms at the default back-off).
const MAX_RETRIES: u32 = 1000;

/// Counters describing the health of the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BufferStats {
    /// Batches that could not be written completely.
    pub overrun_count: usize,
    /// Samples handed to the ring so far.
    pub samples_written: usize,
    /// Ring fill level after the last write.
    pub fill_percentage: f32,
}

/// Writer handle on the shared ring buffer.
pub struct SampleQueue {
    buffer: Arc<RingBuffer>,
    stats: Mutex<BufferStats>,
}

impl SampleQueue {
    /// Allocate the ring described by `config`.
    pub fn new(config: StreamConfig) -> Result<Self, AudioError> {
        Ok(Self {
            buffer: Arc::new(RingBuffer::new(config.ring_buffer_size)?),
            stats: Mutex::new(BufferStats::default()),
        })
    }

    /// Write all of `samples`, sleeping while the ring is full.
    ///
    /// Returns the number of samples written, which is short only when the
    /// consumer stalled for longer than the retry budget.
    pub fn write_blocking(&self, samples: &[f32]) -> usize {
        let mut remaining = samples;
        let mut retries = 0;

        while !remaining.is_empty() && retries < MAX_RETRIES {
            let written = self.buffer.write(remaining);
            if written == 0 {
                thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
                retries += 1;
            } else {
                remaining = &remaining[written..];
                retries = 0;
            }
        }

        let total = samples.len() - remaining.len();
        let mut stats = self.stats.lock();
        stats.samples_written += total;
        stats.fill_percentage = self.buffer.fill_percentage();
        if !remaining.is_empty() {
            stats.overrun_count += 1;
        }
        total
    }

    /// Whether the consumer has read everything written so far.
    pub fn is_drained(&self) -> bool {
        self.buffer.available_read() == 0
    }

    /// Discard buffered audio, e.g. on a track change.
    pub fn clear(&self) {
        self.buffer.clear();
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> BufferStats {
        *self.stats.lock()
    }

    /// The ring, for the consumer side.
    pub fn buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }
}

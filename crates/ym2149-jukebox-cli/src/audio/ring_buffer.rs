//! Fixed-size sample ring shared by the producer thread and the audio callback.
//!
//! One writer, one reader. Storage sits behind a `parking_lot::Mutex`; the
//! read and write cursors are atomics that only ever grow, so the fill level
//! is their difference. Cursors move only while the storage lock is held, so a
//! [`RingBuffer::clear`] can never be undone by a read or write in flight.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::AudioError;

/// Largest ring accepted (256 MiB of `f32`).
const MAX_CAPACITY: usize = 256 * 1024 * 1024 / std::mem::size_of::<f32>();

/// Sample ring with power-of-two capacity.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Mutex<Vec<f32>>,
    written: AtomicUsize,
    read: AtomicUsize,
    capacity: usize,
    mask: usize,
}

impl RingBuffer {
    /// Allocate a ring holding at least `requested` samples.
    ///
    /// The capacity is rounded up to a power of two. One slot always stays
    /// free, so at most `capacity - 1` samples are buffered.
    pub fn new(requested: usize) -> Result<Self, AudioError> {
        if requested < 2 {
            return Err(AudioError::Buffer(format!(
                "capacity must be at least 2, got {requested}"
            )));
        }
        let capacity = requested
            .checked_next_power_of_two()
            .filter(|&cap| cap <= MAX_CAPACITY)
            .ok_or_else(|| {
                AudioError::Buffer(format!(
                    "capacity {requested} exceeds maximum {MAX_CAPACITY}"
                ))
            })?;

        Ok(Self {
            storage: Mutex::new(vec![0.0; capacity]),
            written: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        })
    }

    /// Allocated capacity in samples.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples waiting to be read.
    pub fn available_read(&self) -> usize {
        let written = self.written.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        written.wrapping_sub(read)
    }

    /// Free slots for the producer.
    pub fn available_write(&self) -> usize {
        self.capacity - 1 - self.available_read()
    }

    /// Fill level between 0.0 and 1.0.
    pub fn fill_percentage(&self) -> f32 {
        self.available_read() as f32 / self.capacity as f32
    }

    /// Copy as many of `samples` as fit. Returns the number written.
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut storage = self.storage.lock();
        let start = self.written.load(Ordering::Acquire);
        let count = samples.len().min(self.available_write());
        if count == 0 {
            return 0;
        }

        let offset = start & self.mask;
        let head = count.min(self.capacity - offset);
        storage[offset..offset + head].copy_from_slice(&samples[..head]);
        storage[..count - head].copy_from_slice(&samples[head..count]);
        self.written
            .store(start.wrapping_add(count), Ordering::Release);
        count
    }

    /// Move up to `dest.len()` samples out of the ring. Returns the number read.
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let storage = self.storage.lock();
        let start = self.read.load(Ordering::Acquire);
        let count = dest.len().min(self.available_read());
        if count == 0 {
            return 0;
        }

        let offset = start & self.mask;
        let head = count.min(self.capacity - offset);
        dest[..head].copy_from_slice(&storage[offset..offset + head]);
        dest[head..count].copy_from_slice(&storage[..count - head]);
        self.read.store(start.wrapping_add(count), Ordering::Release);
        count
    }

    /// Drop everything buffered so far.
    pub fn clear(&self) {
        let _storage = self.storage.lock();
        let written = self.written.load(Ordering::Acquire);
        self.read.store(written, Ordering::Release);
    }

    /// Whether nothing is buffered.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_up() {
        assert_eq!(RingBuffer::new(1024).unwrap().capacity(), 1024);
        assert_eq!(RingBuffer::new(1000).unwrap().capacity(), 1024);
        assert_eq!(RingBuffer::new(3).unwrap().capacity(), 4);
    }

    #[test]
    fn test_smallest_ring_holds_one_sample() {
        let ring = RingBuffer::new(2).unwrap();
        assert_eq!(ring.available_write(), 1);
        assert_eq!(ring.write(&[0.5, 0.5]), 1);
        assert_eq!(ring.available_read(), 1);
    }

    #[test]
    fn test_invalid_capacity() {
        for requested in [0, 1] {
            let err = RingBuffer::new(requested).unwrap_err();
            assert!(err.to_string().contains("at least 2"), "{err}");
        }

        let huge = RingBuffer::new(MAX_CAPACITY + 1).unwrap_err();
        assert!(huge.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_write_then_read() {
        let ring = RingBuffer::new(16).unwrap();
        let samples = [0.1, 0.2, 0.3, 0.4];

        assert_eq!(ring.write(&samples), 4);
        assert_eq!(ring.available_read(), 4);

        let mut out = [0.0; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, samples);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_wrap_around_keeps_order() {
        let ring = RingBuffer::new(8).unwrap();
        let first: Vec<f32> = (0..6).map(|i| i as f32).collect();
        assert_eq!(ring.write(&first), 6);

        let mut out = [0.0; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0]);

        // Crosses the end of the storage.
        assert_eq!(ring.write(&[6.0, 7.0, 8.0, 9.0, 10.0]), 5);

        let mut rest = [0.0; 8];
        assert_eq!(ring.read(&mut rest), 7);
        assert_eq!(&rest[..7], &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_full_ring_rejects_writes() {
        let ring = RingBuffer::new(8).unwrap();
        assert_eq!(ring.write(&[1.0; 16]), 7);
        assert_eq!(ring.available_write(), 0);
        assert_eq!(ring.write(&[1.0]), 0);
        assert!(ring.fill_percentage() > 0.85);
    }

    #[test]
    fn test_clear() {
        let ring = RingBuffer::new(16).unwrap();
        ring.write(&[1.0; 8]);
        assert!(!ring.is_empty());

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.write(&[2.0; 4]), 4);
        let mut out = [0.0; 4];
        ring.read(&mut out);
        assert_eq!(out, [2.0; 4]);
    }

    #[test]
    fn test_clear_is_not_undone_by_concurrent_reads() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;
        use std::thread;

        let ring = Arc::new(RingBuffer::new(64).unwrap());
        let done = Arc::new(AtomicBool::new(false));

        // Every batch carries its own number; after a clear only newer
        // batches may show up, so the consumer must never go backwards.
        let consumer = thread::spawn({
            let ring = Arc::clone(&ring);
            let done = Arc::clone(&done);
            move || {
                let mut last = 0.0f32;
                let mut scratch = [0.0; 5];
                while !done.load(Ordering::Acquire) || !ring.is_empty() {
                    let n = ring.read(&mut scratch);
                    for &sample in &scratch[..n] {
                        assert!(sample >= last, "sample {sample} after {last}");
                        last = sample;
                    }
                }
            }
        });

        for batch in 1..=5000u32 {
            while ring.write(&[batch as f32; 4]) == 0 {
                thread::yield_now();
            }
            if batch % 7 == 0 {
                ring.clear();
            }
        }
        ring.clear();
        done.store(true, Ordering::Release);
        consumer.join().unwrap();
        assert!(ring.is_empty());
    }
}

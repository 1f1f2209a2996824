//! Thread-safe input queue drained by the device
//!
//! Producers (console, pass-through device) append to the tail from their own
//! threads; the sequential reader drains from the head while servicing
//! commands. Every operation takes the single queue lock, so a drain can never
//! observe a half-finished append. Nothing here waits for the queue to grow.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared FIFO byte queue
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    inner: Arc<Mutex<VecDeque<u8>>>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append bytes to the tail
    pub fn append(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut queue = self.lock();
        queue.extend(bytes);
        log::trace!("Input queued: {} bytes ({} pending)", bytes.len(), queue.len());
    }

    /// Snapshot of the number of queued bytes
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    /// Remove and return up to `max_count` bytes from the head
    ///
    /// The returned length is the actual count removed, never more than was
    /// queued at the moment of the call.
    pub fn drain(&self, max_count: usize) -> Vec<u8> {
        let mut queue = self.lock();
        let count = max_count.min(queue.len());
        queue.drain(..count).collect()
    }

    /// Head byte without removing it
    pub fn peek_one(&self) -> Option<u8> {
        self.lock().front().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_available_sums_appends() {
        let queue = InputQueue::new();
        queue.append(b"abc");
        queue.append(b"de");
        assert_eq!(queue.available(), 5);
    }

    #[test]
    fn test_drain_clamps_to_available() {
        let queue = InputQueue::new();
        queue.append(b"hello");

        assert_eq!(queue.drain(3), b"hel");
        assert_eq!(queue.available(), 2);
        assert_eq!(queue.drain(100), b"lo");
        assert_eq!(queue.available(), 0);
        assert!(queue.drain(4).is_empty());
    }

    #[test]
    fn test_peek_is_non_destructive() {
        let queue = InputQueue::new();
        assert_eq!(queue.peek_one(), None);

        queue.append(b"xy");
        assert_eq!(queue.peek_one(), Some(b'x'));
        assert_eq!(queue.peek_one(), Some(b'x'));
        assert_eq!(queue.available(), 2);

        queue.drain(1);
        assert_eq!(queue.peek_one(), Some(b'y'));
    }

    #[test]
    fn test_clones_share_state() {
        let producer = InputQueue::new();
        let consumer = producer.clone();
        producer.append(b"q");
        assert_eq!(consumer.drain(1), b"q");
        assert_eq!(producer.available(), 0);
    }

    #[test]
    fn test_concurrent_appends_and_drains_keep_every_byte() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 2_000;

        let queue = InputQueue::new();
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        // Tag each byte with its producer in the top bits
                        queue.append(&[((p as u8) << 6) | (i % 64) as u8]);
                    }
                })
            })
            .collect();

        let mut received = Vec::new();
        while received.len() < PRODUCERS * PER_PRODUCER {
            received.extend(queue.drain(37));
            if handles.iter().all(|h| h.is_finished()) {
                received.extend(queue.drain(usize::MAX));
            }
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(received.len(), PRODUCERS * PER_PRODUCER);
        assert_eq!(queue.available(), 0);

        // Per-producer order survives interleaving
        for p in 0..PRODUCERS {
            let sequence: Vec<u8> = received
                .iter()
                .filter(|b| (*b >> 6) as usize == p)
                .map(|b| b & 0x3F)
                .collect();
            let expected: Vec<u8> = (0..PER_PRODUCER).map(|i| (i % 64) as u8).collect();
            assert_eq!(sequence, expected);
        }
    }
}

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::chunk::AudioChunk;

/// Thread-safe FIFO of raw audio chunks.
///
/// The capture thread is the sole writer (`push`) and the consumer loop the
/// sole drainer (`drain`). A drain removes and returns everything currently
/// queued as one atomic batch relative to concurrent pushes, preserving
/// arrival order exactly.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    inner: Mutex<VecDeque<AudioChunk>>,
    notify: Notify,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and wake a waiting consumer. Must never block on
    /// anything slower than the queue mutex; it runs on the audio thread.
    pub fn push(&self, chunk: AudioChunk) {
        self.inner.lock().push_back(chunk);
        self.notify.notify_one();
    }

    /// Remove and return all currently queued chunks in arrival order.
    pub fn drain(&self) -> Vec<AudioChunk> {
        let mut inner = self.inner.lock();
        inner.drain(..).collect()
    }

    /// Discard queued chunks, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.len();
        inner.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Block until a push lands or `timeout` elapses. Returns whether the
    /// queue is non-empty afterwards. Lets the consumer sleep between
    /// drains instead of busy-polling.
    pub async fn wait_non_empty(&self, timeout: Duration) -> bool {
        if !self.is_empty() {
            return true;
        }
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
        !self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_chunks_in_arrival_order() {
        let queue = ChunkQueue::new();
        queue.push(AudioChunk::new(vec![1]));
        queue.push(AudioChunk::new(vec![2]));
        queue.push(AudioChunk::new(vec![3]));

        let batch = queue.drain();
        let values: Vec<i16> = batch.iter().map(|c| c.samples()[0]).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(queue.is_empty(), "drain must leave the queue empty");
    }

    #[test]
    fn clear_reports_dropped_count() {
        let queue = ChunkQueue::new();
        queue.push(AudioChunk::new(vec![0]));
        queue.push(AudioChunk::new(vec![0]));
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.clear(), 0);
    }

    #[tokio::test]
    async fn wait_non_empty_wakes_on_push() {
        use std::sync::Arc;

        let queue = Arc::new(ChunkQueue::new());
        let producer = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push(AudioChunk::new(vec![7]));
        });

        assert!(queue.wait_non_empty(Duration::from_secs(2)).await);
        assert_eq!(queue.drain().len(), 1);
    }

    #[tokio::test]
    async fn wait_non_empty_times_out_when_idle() {
        let queue = ChunkQueue::new();
        assert!(!queue.wait_non_empty(Duration::from_millis(20)).await);
    }
}

//! Bounded FIFO job queue.

use parking_lot::RwLock;
use ratekeeper_common::{RatesError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::job::Job;

/// Producer side of the job queue. Shared by all submitters.
pub struct JobQueue {
    sender: RwLock<Option<mpsc::Sender<Job>>>,
    depth: Arc<AtomicUsize>,
    capacity: usize,
}

/// Consumer side of the job queue. Owned by the worker.
pub struct JobReceiver {
    receiver: mpsc::Receiver<Job>,
    depth: Arc<AtomicUsize>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` waiting jobs.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        let depth = Arc::new(AtomicUsize::new(0));
        (
            Self {
                sender: RwLock::new(Some(sender)),
                depth: depth.clone(),
                capacity,
            },
            JobReceiver { receiver, depth },
        )
    }

    /// Add a job, waiting while the queue is full.
    pub async fn enqueue(&self, job: Job) -> Result<()> {
        let sender = self.sender.read().clone().ok_or(RatesError::QueueClosed)?;
        let permit = sender.reserve().await.map_err(|_| RatesError::QueueClosed)?;
        // Counted before the job becomes visible to the receiver.
        self.depth.fetch_add(1, Ordering::SeqCst);
        permit.send(job);
        Ok(())
    }

    /// Stop accepting jobs. Jobs already queued are still delivered.
    pub fn close(&self) {
        self.sender.write().take();
    }

    /// Check if the queue still accepts jobs.
    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .as_ref()
            .map_or(true, mpsc::Sender::is_closed)
    }

    /// Jobs waiting to be picked up, including those buffered after close.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Check if no jobs are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of waiting jobs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl JobReceiver {
    /// Next job in FIFO order, or `None` once the queue is closed and empty.
    pub async fn dequeue(&mut self) -> Option<Job> {
        let job = self.receiver.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::RateUpdateJob;
    use ratekeeper_common::{CurrencyPair, RequestId};
    use ratekeeper_source::MockRateSource;
    use ratekeeper_store::MemoryRateStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn job(id: u64) -> Job {
        Job::RateUpdate(RateUpdateJob {
            pair: CurrencyPair::parse("EUR/USD").unwrap(),
            request_id: RequestId::new(id),
            store: Arc::new(MemoryRateStore::new()),
            source: Arc::new(MockRateSource::new("mock")),
        })
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut receiver) = JobQueue::bounded(4);
        for id in 1..=3 {
            queue.enqueue(job(id)).await.unwrap();
        }
        assert_eq!(queue.len(), 3);

        for id in 1..=3 {
            let next = receiver.dequeue().await.unwrap();
            assert_eq!(next.request_id(), RequestId::new(id));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_waits_when_full() {
        let (queue, mut receiver) = JobQueue::bounded(1);
        queue.enqueue(job(1)).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), queue.enqueue(job(2))).await;
        assert!(blocked.is_err());

        receiver.dequeue().await.unwrap();
        queue.enqueue(job(3)).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.capacity(), 1);
    }

    #[tokio::test]
    async fn test_closed_queue() {
        let (queue, mut receiver) = JobQueue::bounded(2);
        queue.enqueue(job(1)).await.unwrap();
        queue.close();

        assert!(queue.is_closed());
        let err = queue.enqueue(job(2)).await.unwrap_err();
        assert!(matches!(err, RatesError::QueueClosed));

        assert!(receiver.dequeue().await.is_some());
        assert!(receiver.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_len_counts_jobs_buffered_after_close() {
        let (queue, mut receiver) = JobQueue::bounded(4);
        queue.enqueue(job(1)).await.unwrap();
        queue.enqueue(job(2)).await.unwrap();
        queue.close();

        assert_eq!(queue.len(), 2);
        receiver.dequeue().await.unwrap();
        assert_eq!(queue.len(), 1);
        receiver.dequeue().await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_receiver_dropped() {
        let (queue, receiver) = JobQueue::bounded(2);
        drop(receiver);

        assert!(queue.is_closed());
        assert!(matches!(
            queue.enqueue(job(1)).await,
            Err(RatesError::QueueClosed)
        ));
    }
}

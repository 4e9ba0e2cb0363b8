use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use common::types::{InteractionLogRecord, SafetyIncidentRecord};

struct Ring<T> {
    capacity: usize,
    buffer: Mutex<VecDeque<T>>,
    notify: Notify,
}

/// One append-only sink backed by a bounded ring buffer and a dedicated
/// drainer task. Producers never block: a full buffer drops the oldest
/// queued record to make room for the new one and bumps `dropped`, trading
/// completeness for the request path never stalling on logging (§9's
/// background-work design note).
pub struct LogSink<T> {
    ring: Arc<Ring<T>>,
    dropped: Arc<AtomicU64>,
}

impl<T: Send + 'static> LogSink<T> {
    pub fn spawn(capacity: usize, drain: impl Fn(T) + Send + Sync + 'static) -> Self {
        let ring = Arc::new(Ring {
            capacity: capacity.max(1),
            buffer: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            notify: Notify::new(),
        });
        let dropped = Arc::new(AtomicU64::new(0));

        let drainer_ring = Arc::clone(&ring);
        tokio::spawn(async move {
            loop {
                let record = loop {
                    let popped = drainer_ring
                        .buffer
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .pop_front();
                    if let Some(record) = popped {
                        break record;
                    }
                    drainer_ring.notify.notified().await;
                };
                drain(record);
            }
        });

        Self { ring, dropped }
    }

    /// Enqueues `record` without blocking. Never fails the caller: when the
    /// buffer is already at capacity the oldest queued record is dropped to
    /// make room, the drop is counted, and `record` is always accepted.
    pub fn enqueue(&self, record: T) {
        {
            let mut buffer = self
                .ring
                .buffer
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if buffer.len() >= self.ring.capacity {
                buffer.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    dropped_total = self.dropped.load(Ordering::Relaxed),
                    "log sink queue full, dropping oldest record"
                );
            }
            buffer.push_back(record);
        }
        self.ring.notify.notify_one();
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The two append-only sinks C9 requires: interaction logs and safety
/// incidents. Both are fire-and-forget from the orchestrator's perspective.
pub struct LoggingSinks {
    pub interactions: LogSink<InteractionLogRecord>,
    pub safety_incidents: LogSink<SafetyIncidentRecord>,
}

impl LoggingSinks {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            interactions: LogSink::spawn(queue_capacity, |record: InteractionLogRecord| {
                tracing::info!(
                    query_id = %record.query_id,
                    session_id = %record.session_id,
                    confidence = record.confidence,
                    retrieval_count = record.retrieval_count,
                    processing_time_ms = record.processing_time_ms,
                    "interaction logged"
                );
            }),
            safety_incidents: LogSink::spawn(queue_capacity, |record: SafetyIncidentRecord| {
                tracing::warn!(
                    query_id = %record.query_id,
                    session_id = %record.session_id,
                    risk_level = ?record.assessment.risk_level,
                    "safety incident logged"
                );
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn enqueued_records_reach_the_drainer() {
        let received = Arc::new(AtomicUsize::new(0));
        let received_clone = Arc::clone(&received);
        let sink: LogSink<u32> = LogSink::spawn(8, move |_record| {
            received_clone.fetch_add(1, Ordering::SeqCst);
        });

        sink.enqueue(1);
        sink.enqueue(2);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(received.load(Ordering::SeqCst), 2);
        assert_eq!(sink.dropped_count(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_the_oldest_record_and_counts_it() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let sink: LogSink<u32> = LogSink::spawn(2, move |record| {
            received_clone.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(record);
        });

        // The drainer task hasn't had a chance to run yet (no await point
        // reached on this current-thread test runtime), so these three
        // enqueues land in the buffer before anything is drained.
        sink.enqueue(1);
        sink.enqueue(2);
        sink.enqueue(3);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(sink.dropped_count(), 1);
        assert_eq!(*received.lock().unwrap_or_else(std::sync::PoisonError::into_inner), vec![2, 3]);
    }
}

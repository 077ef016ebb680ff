//! Error sink implementations.
//!
//! The scheduler reports every non-fatal failure here. Reporting never waits
//! on a consumer: sinks either drop, log, or buffer with a bounded capacity.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::core::{MessageId, MessengerError};
use crate::util::clock::now_ms;

/// Delivery-cycle step that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Taking the next message from the store.
    Claim,
    /// Loading recipients of a claimed message.
    Recipients,
    /// Handing the message to the notification sender.
    Delivery,
}

/// A scheduler failure forwarded for observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Step that failed.
    pub stage: FailureStage,
    /// Claimed message involved, if the failure happened after claim.
    pub message_id: Option<MessageId>,
    /// Underlying error.
    pub error: MessengerError,
    /// Timestamp milliseconds.
    pub occurred_at_ms: u128,
}

impl std::fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.stage, self.message_id) {
            (FailureStage::Claim, _) | (_, None) => {
                write!(f, "failed to claim next message: {}", self.error)
            }
            (FailureStage::Recipients, Some(id)) => {
                write!(f, "failed to get recipients for message {id}: {}", self.error)
            }
            (FailureStage::Delivery, Some(id)) => {
                write!(f, "failed to send notification for message {id}: {}", self.error)
            }
        }
    }
}

/// Helper to build an error event stamped with the current time.
pub fn build_error_event(
    stage: FailureStage,
    message_id: Option<MessageId>,
    error: MessengerError,
) -> ErrorEvent {
    ErrorEvent {
        stage,
        message_id,
        error,
        occurred_at_ms: now_ms(),
    }
}

/// Non-blocking consumer of scheduler errors.
pub trait ErrorSink: Send + Sync {
    /// Record an error event. Must return without waiting on any consumer.
    fn report(&self, event: ErrorEvent);
}

/// Sink used when nobody listens for errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopErrorSink;

impl ErrorSink for NoopErrorSink {
    fn report(&self, _event: ErrorEvent) {}
}

/// Sink that logs each event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, event: ErrorEvent) {
        tracing::error!(stage = ?event.stage, message_id = ?event.message_id, "{event}");
    }
}

/// Bounded in-memory sink that drops the oldest event when full.
///
/// A consumer task can await [`BoundedErrorSink::recv`]; producers never wait.
pub struct BoundedErrorSink {
    events: Mutex<VecDeque<ErrorEvent>>,
    max_events: usize,
    dropped: AtomicU64,
    notify: Notify,
}

impl BoundedErrorSink {
    /// Create a new sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events: max_events.max(1),
            dropped: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Retrieve a snapshot of buffered events without consuming them.
    pub fn events(&self) -> Vec<ErrorEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Remove and return every buffered event.
    pub fn drain(&self) -> Vec<ErrorEvent> {
        self.events.lock().drain(..).collect()
    }

    /// Number of events evicted because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wait for the next event.
    pub async fn recv(&self) -> ErrorEvent {
        loop {
            let notified = self.notify.notified();
            if let Some(event) = self.events.lock().pop_front() {
                return event;
            }
            notified.await;
        }
    }
}

impl ErrorSink for BoundedErrorSink {
    fn report(&self, event: ErrorEvent) {
        {
            let mut events = self.events.lock();
            if events.len() >= self.max_events {
                events.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            events.push_back(event);
        }
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn delivery_failure(id: MessageId) -> ErrorEvent {
        build_error_event(
            FailureStage::Delivery,
            Some(id),
            MessengerError::Delivery("provider down".into()),
        )
    }

    #[test]
    fn test_bounded_sink_drops_oldest() {
        let sink = BoundedErrorSink::new(2);
        sink.report(delivery_failure(1));
        sink.report(delivery_failure(2));
        sink.report(delivery_failure(3));

        let ids: Vec<_> = sink.events().iter().map(|e| e.message_id).collect();
        assert_eq!(ids, vec![Some(2), Some(3)]);
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn test_drain_empties_buffer() {
        let sink = BoundedErrorSink::new(8);
        sink.report(delivery_failure(1));
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_recv_wakes_on_report() {
        let sink = Arc::new(BoundedErrorSink::new(4));
        let consumer = {
            let sink = Arc::clone(&sink);
            tokio::spawn(async move { sink.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        sink.report(delivery_failure(7));

        let event = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer woke")
            .expect("consumer joined");
        assert_eq!(event.message_id, Some(7));
    }

    #[test]
    fn test_event_display() {
        let event = build_error_event(
            FailureStage::Recipients,
            Some(4),
            MessengerError::Persistence("disk".into()),
        );
        assert_eq!(
            event.to_string(),
            "failed to get recipients for message 4: persistence error: disk"
        );

        let event = build_error_event(
            FailureStage::Claim,
            None,
            MessengerError::Persistence("locked".into()),
        );
        assert_eq!(
            event.to_string(),
            "failed to claim next message: persistence error: locked"
        );
    }
}

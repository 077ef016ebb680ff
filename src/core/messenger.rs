//! Application facade: accepts SMS requests and owns the delivery loop.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{
    Buffer, DeliveryScheduler, ErrorSink, MessengerError, NotificationSender, SchedulerHandle,
    SchedulerMonitor, SchedulerSettings, SchedulerState, ShutdownOutcome, Timer,
};

/// A single-recipient SMS request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sms {
    /// Sender name or number.
    pub originator: String,
    /// Destination phone number.
    pub recipient: String,
    /// Message body.
    pub message: String,
}

/// Enqueues SMS requests into a buffer and runs the scheduler that drains it.
pub struct Messenger {
    buffer: Arc<dyn Buffer>,
    settings: SchedulerSettings,
    scheduler: Option<SchedulerHandle>,
    monitor: Option<SchedulerMonitor>,
}

impl Messenger {
    /// Create a messenger over `buffer`. Delivery does not begin until [`Messenger::start`].
    pub fn new(buffer: Arc<dyn Buffer>, settings: SchedulerSettings) -> Self {
        Self {
            buffer,
            settings,
            scheduler: None,
            monitor: None,
        }
    }

    /// Save `sms` into the buffer. Identical pending texts from the same
    /// originator are merged into one message with several recipients.
    ///
    /// # Errors
    ///
    /// Whatever the buffer returns from `save`.
    pub async fn enqueue_sms(&self, sms: &Sms) -> Result<(), MessengerError> {
        self.buffer
            .save(&sms.recipient, &sms.originator, &sms.message)
            .await
    }

    /// Spawn the delivery loop.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Config`] if the loop is already running.
    pub fn start<S, T>(
        &mut self,
        sender: Arc<S>,
        timer: T,
        errors: Arc<dyn ErrorSink>,
    ) -> Result<(), MessengerError>
    where
        S: NotificationSender + ?Sized + 'static,
        T: Timer + 'static,
    {
        if self.scheduler.is_some() {
            return Err(MessengerError::Config("messenger already started".into()));
        }
        let scheduler =
            DeliveryScheduler::new(self.settings, Arc::clone(&self.buffer), sender, timer)
                .with_error_sink(errors);
        let handle = scheduler.spawn();
        self.monitor = Some(handle.monitor());
        self.scheduler = Some(handle);
        info!("messenger started");
        Ok(())
    }

    /// Whether the delivery loop has been started and not shut down.
    pub const fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    /// State of the most recently started delivery loop. Stays available
    /// after shutdown, ending in `Stopped` once the loop exits.
    pub fn scheduler_state(&self) -> Option<SchedulerState> {
        self.monitor.as_ref().map(SchedulerMonitor::state)
    }

    /// Stop the delivery loop within the configured grace period.
    /// A messenger that was never started shuts down gracefully.
    pub async fn shutdown(&mut self) -> ShutdownOutcome {
        match self.scheduler.take() {
            Some(handle) => handle.shutdown().await,
            None => ShutdownOutcome::Graceful,
        }
    }
}

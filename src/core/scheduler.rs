//! Delivery scheduler: a single cooperative loop that polls the buffer on a
//! timer and hands each claimed message to the notification sender.
//!
//! One tick claims at most one message and performs at most one delivery
//! attempt. The loop never stops because of a failed tick; every failure is
//! forwarded to the configured [`ErrorSink`].
//!
//! Shutdown is observed only between ticks. An in-flight claim or send is
//! always allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::{
    build_error_event, Buffer, ErrorSink, FailureStage, MessageId, MessengerError,
    NoopErrorSink, NotificationSender,
};

/// Default delay between two ticks.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);
/// Default time the caller waits for the loop to acknowledge shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Source of tick delays, injectable so tests can drive time explicitly.
#[async_trait]
pub trait Timer: Send + Sync {
    /// Complete once `period` has elapsed (or whenever the timer decides to fire).
    async fn sleep(&self, period: Duration);
}

/// Lifecycle of a scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Timer armed, waiting for the next tick.
    Idle,
    /// Timer fired; checking for a stop request.
    Polling,
    /// Claiming the next message and loading its recipients.
    Claiming,
    /// Waiting on the notification sender.
    Delivering,
    /// Stop acknowledged; loop winding down.
    Stopping,
    /// Loop has exited.
    Stopped,
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was waiting in the buffer.
    Idle,
    /// A message was claimed and the sender reported success.
    Delivered {
        /// Claimed message.
        message_id: MessageId,
        /// Number of recipients handed to the sender.
        recipients: usize,
    },
    /// A message was claimed but had no recipients; nothing was sent.
    NoRecipients {
        /// Claimed message.
        message_id: MessageId,
    },
    /// A step failed and the error went to the error sink.
    Failed {
        /// Step that failed.
        stage: FailureStage,
        /// Claimed message, when the failure happened after claim.
        message_id: Option<MessageId>,
    },
}

/// How a shutdown request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The loop acknowledged the stop and exited.
    Graceful,
    /// The loop did not exit within the grace period; it was left to finish on its own.
    TimedOut,
    /// The loop task panicked or was cancelled.
    Crashed(String),
}

/// Shared, cloneable view of a scheduler's lifecycle state.
///
/// Outlives the [`SchedulerHandle`], so the terminal state stays observable
/// after shutdown. `Stopping` only advances to `Stopped`, and `Stopped` is final.
#[derive(Debug, Clone)]
pub struct SchedulerMonitor {
    state: Arc<Mutex<SchedulerState>>,
}

impl SchedulerMonitor {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState::Idle)),
        }
    }

    /// Current loop state.
    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    fn transition(&self, next: SchedulerState) {
        let mut state = self.state.lock();
        match (*state, next) {
            (SchedulerState::Stopped, _) => {}
            (SchedulerState::Stopping, to) if to != SchedulerState::Stopped => {}
            _ => *state = next,
        }
    }
}

/// Timing knobs for a scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Delay between ticks.
    pub tick_period: Duration,
    /// Maximum wait for the loop to acknowledge shutdown.
    pub shutdown_grace: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Polling delivery loop over a shared buffer.
///
/// The buffer is the single source of truth; nothing about queue state is
/// cached between ticks.
pub struct DeliveryScheduler<B: ?Sized, S: ?Sized, T> {
    settings: SchedulerSettings,
    buffer: Arc<B>,
    sender: Arc<S>,
    timer: T,
    errors: Arc<dyn ErrorSink>,
    monitor: SchedulerMonitor,
}

impl<B, S, T> DeliveryScheduler<B, S, T>
where
    B: Buffer + ?Sized + 'static,
    S: NotificationSender + ?Sized + 'static,
    T: Timer + 'static,
{
    /// Create a scheduler with a no-op error sink.
    pub fn new(settings: SchedulerSettings, buffer: Arc<B>, sender: Arc<S>, timer: T) -> Self {
        Self {
            settings,
            buffer,
            sender,
            timer,
            errors: Arc::new(NoopErrorSink),
            monitor: SchedulerMonitor::new(),
        }
    }

    /// Attach an error sink.
    #[must_use]
    pub fn with_error_sink(mut self, errors: Arc<dyn ErrorSink>) -> Self {
        self.errors = errors;
        self
    }

    /// Current loop state.
    pub fn state(&self) -> SchedulerState {
        self.monitor.state()
    }

    /// Shared view of the loop state.
    pub fn monitor(&self) -> SchedulerMonitor {
        self.monitor.clone()
    }

    fn set_state(&self, next: SchedulerState) {
        self.monitor.transition(next);
    }

    fn report(
        &self,
        stage: FailureStage,
        message_id: Option<MessageId>,
        err: MessengerError,
    ) -> TickOutcome {
        warn!(stage = ?stage, message_id = ?message_id, error = %err, "delivery cycle failed");
        self.errors.report(build_error_event(stage, message_id, err));
        TickOutcome::Failed { stage, message_id }
    }

    /// Run one delivery cycle: claim, load recipients, send.
    ///
    /// A message is claimed before delivery is attempted, so a failed
    /// recipient lookup or send leaves it claimed and it is not retried.
    /// The state is back to `Idle` when this returns.
    pub async fn tick(&self) -> TickOutcome {
        let outcome = self.deliver_next().await;
        self.set_state(SchedulerState::Idle);
        outcome
    }

    async fn deliver_next(&self) -> TickOutcome {
        self.set_state(SchedulerState::Claiming);

        let message = match self.buffer.claim().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("no messages waiting for delivery");
                return TickOutcome::Idle;
            }
            Err(e) => return self.report(FailureStage::Claim, None, e),
        };

        let recipients = match self.buffer.recipients(message.id).await {
            Ok(recipients) => recipients,
            Err(e) => return self.report(FailureStage::Recipients, Some(message.id), e),
        };

        if recipients.is_empty() {
            warn!(message_id = message.id, "claimed message has no recipients");
            return TickOutcome::NoRecipients {
                message_id: message.id,
            };
        }

        self.set_state(SchedulerState::Delivering);
        debug!(
            message_id = message.id,
            recipients = recipients.len(),
            "delivering message"
        );
        match self.sender.send(&message, &recipients).await {
            Ok(()) => {
                info!(
                    message_id = message.id,
                    recipients = recipients.len(),
                    "message delivered"
                );
                TickOutcome::Delivered {
                    message_id: message.id,
                    recipients: recipients.len(),
                }
            }
            Err(e) => self.report(FailureStage::Delivery, Some(message.id), e),
        }
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let monitor = self.monitor.clone();
        let grace = self.settings.shutdown_grace;
        let join = tokio::spawn(self.run(stop_rx));
        SchedulerHandle {
            stop_tx,
            join,
            monitor,
            grace,
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        let tick_period_ms =
            u64::try_from(self.settings.tick_period.as_millis()).unwrap_or(u64::MAX);
        info!(tick_period_ms, "delivery scheduler started");
        loop {
            self.set_state(SchedulerState::Idle);
            tokio::select! {
                biased;
                // A dropped handle counts as a stop request.
                _ = stop.changed() => break,
                () = self.timer.sleep(self.settings.tick_period) => {}
            }

            self.set_state(SchedulerState::Polling);
            let stop_requested = *stop.borrow();
            if stop_requested {
                break;
            }

            let outcome = self.tick().await;
            debug!(?outcome, "tick finished");
        }
        self.set_state(SchedulerState::Stopping);
        info!("delivery scheduler stopped");
        self.set_state(SchedulerState::Stopped);
    }
}

/// Handle to a spawned scheduler loop.
///
/// Dropping the handle also stops the loop at its next tick boundary.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
    monitor: SchedulerMonitor,
    grace: Duration,
}

impl SchedulerHandle {
    /// Current loop state.
    pub fn state(&self) -> SchedulerState {
        self.monitor.state()
    }

    /// Shared view of the loop state that survives shutdown.
    pub fn monitor(&self) -> SchedulerMonitor {
        self.monitor.clone()
    }

    /// Whether the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Request a stop and wait up to the configured grace period.
    pub async fn shutdown(self) -> ShutdownOutcome {
        let grace = self.grace;
        self.shutdown_within(grace).await
    }

    /// Request a stop and wait up to `grace` for the loop to exit.
    ///
    /// The state moves to `Stopping` immediately. A timeout is logged and
    /// reported, never escalated: the loop keeps its stop request and exits
    /// after the tick in progress.
    pub async fn shutdown_within(mut self, grace: Duration) -> ShutdownOutcome {
        info!("gracefully shutting down delivery scheduler...");
        self.stop_tx.send_replace(true);
        self.monitor.transition(SchedulerState::Stopping);

        match tokio::time::timeout(grace, &mut self.join).await {
            Ok(Ok(())) => {
                info!("delivery scheduler has been stopped");
                ShutdownOutcome::Graceful
            }
            Ok(Err(e)) => {
                error!(error = %e, "delivery scheduler task failed");
                ShutdownOutcome::Crashed(e.to_string())
            }
            Err(_) => {
                error!(
                    grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                    "failed to gracefully shutdown delivery scheduler"
                );
                ShutdownOutcome::TimedOut
            }
        }
    }
}

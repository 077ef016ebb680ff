//! Core delivery abstractions: buffer and sender contracts, the scheduler,
//! error reporting and the messenger facade.

pub mod buffer;
pub mod error;
pub mod error_sink;
pub mod messenger;
pub mod scheduler;
pub mod sender;

pub use buffer::{Buffer, MessageId, QueuedMessage, Recipient};
pub use error::{AppResult, MessengerError};
pub use error_sink::{
    build_error_event, BoundedErrorSink, ErrorEvent, ErrorSink, FailureStage, NoopErrorSink,
    TracingErrorSink,
};
pub use messenger::{Messenger, Sms};
pub use scheduler::{
    DeliveryScheduler, SchedulerHandle, SchedulerMonitor, SchedulerSettings, SchedulerState,
    ShutdownOutcome, TickOutcome, Timer,
};
pub use sender::NotificationSender;

//! Runtime adapters and API surface.

pub mod api;
pub mod tokio_timer;

pub use api::{health, submit_sms, Accepted, Health, SmsSubmission, MAX_MESSAGE_CHARS};
pub use tokio_timer::TokioTimer;

//! Notification sender backends.

pub mod log;
pub mod messagebird;
pub mod twilio;

pub use log::LogSender;
pub use messagebird::MessageBirdSender;
pub use twilio::TwilioSender;

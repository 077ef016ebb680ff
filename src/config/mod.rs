//! Configuration models for the buffer, sender, scheduler timing, and logging.

pub mod messenger;

pub use messenger::{BufferBackendConfig, LogFormat, MessengerConfig, SenderConfig};

//! Infrastructure adapters for buffer stores and delivery providers.

pub mod buffer;
pub mod sender;
pub use buffer::InMemoryBuffer;
pub use buffer::SqliteBuffer;
pub use sender::LogSender;
pub use sender::MessageBirdSender;
pub use sender::TwilioSender;

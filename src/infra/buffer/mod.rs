//! Buffer backends.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryBuffer;
pub use sqlite::SqliteBuffer;

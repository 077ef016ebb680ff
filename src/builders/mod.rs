//! Builders to construct messenger components from configuration.

pub mod messenger_builder;

pub use messenger_builder::{build_buffer, build_error_sink, build_scheduler, build_sender};

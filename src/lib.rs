//! # Buffered Messenger
//!
//! A durable outbound SMS queue with a polling delivery loop.
//!
//! Incoming requests are saved into a buffer store. Requests that share an
//! originator and text while still pending collapse into one message with
//! several recipients, so a burst of identical notifications costs one
//! provider call. A single delivery scheduler wakes on a fixed period, claims
//! the oldest pending message, loads its recipients and hands it to a
//! notification sender.
//!
//! ## Key Properties
//!
//! - **Claim is terminal**: a claimed message never becomes claimable again,
//!   even when delivery fails. Delivery is at most once.
//! - **Serialized store access**: concurrent saves and claims, including from
//!   several scheduler instances over one SQLite file, never duplicate a
//!   message or hand it out twice.
//! - **Non-fatal failures**: claim, recipient and delivery errors go to an
//!   [`core::ErrorSink`]; the loop keeps ticking.
//! - **Bounded shutdown**: stop is observed between ticks and the caller waits
//!   at most a grace period.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use buffered_messenger::core::{Messenger, SchedulerSettings, Sms, TracingErrorSink};
//! use buffered_messenger::infra::{InMemoryBuffer, LogSender};
//! use buffered_messenger::runtime::TokioTimer;
//!
//! let buffer = Arc::new(InMemoryBuffer::new());
//! let mut messenger = Messenger::new(buffer, SchedulerSettings::default());
//! messenger.start(Arc::new(LogSender), TokioTimer, Arc::new(TracingErrorSink))?;
//! messenger
//!     .enqueue_sms(&Sms {
//!         originator: "Acme".into(),
//!         recipient: "+31600000000".into(),
//!         message: "Your code is 1234".into(),
//!     })
//!     .await?;
//! messenger.shutdown().await;
//! ```
//!
//! See `src/bin/messenger.rs` for a configured daemon.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core delivery abstractions: buffer, sender, scheduler and error sink.
pub mod core;
/// Configuration models for the scheduler, backends and providers.
pub mod config;
/// Builders to construct messenger components from configuration.
pub mod builders;
/// Infrastructure adapters for buffer stores and delivery providers.
pub mod infra;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;

//! Messenger daemon.
//!
//! Reads `MESSENGER_*` settings from the environment (and `.env`), starts the
//! delivery loop and runs until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};

use buffered_messenger::builders::{build_buffer, build_error_sink, build_sender};
use buffered_messenger::config::MessengerConfig;
use buffered_messenger::core::{AppResult, Messenger, ShutdownOutcome};
use buffered_messenger::runtime::TokioTimer;
use buffered_messenger::util::init_tracing;

#[tokio::main]
async fn main() -> AppResult<()> {
    let cfg = MessengerConfig::from_env().context("failed to load configuration")?;
    init_tracing(cfg.log_format);

    let buffer = build_buffer(&cfg.buffer).context("failed to open buffer")?;
    let sender = build_sender(&cfg.sender, reqwest::Client::new());
    let errors = build_error_sink(&cfg);

    let drain = {
        let errors = Arc::clone(&errors);
        tokio::spawn(async move {
            loop {
                let event = errors.recv().await;
                error!(stage = ?event.stage, message_id = ?event.message_id, "{event}");
            }
        })
    };

    let mut messenger = Messenger::new(buffer, cfg.scheduler_settings());
    messenger.start(sender, TokioTimer, errors.clone())?;
    info!(tick_period_ms = cfg.tick_period_ms, "messenger running; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    let outcome = messenger.shutdown().await;
    drain.abort();
    if errors.dropped() > 0 {
        warn!(dropped = errors.dropped(), "error events were dropped");
    }
    match outcome {
        ShutdownOutcome::Graceful => Ok(()),
        ShutdownOutcome::TimedOut => {
            warn!("exiting with delivery still in progress");
            Ok(())
        }
        ShutdownOutcome::Crashed(reason) => anyhow::bail!("delivery scheduler crashed: {reason}"),
    }
}

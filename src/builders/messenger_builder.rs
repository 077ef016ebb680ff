//! Turn a [`MessengerConfig`] into live buffer, sender and scheduler instances.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{BufferBackendConfig, MessengerConfig, SenderConfig};
use crate::core::{
    BoundedErrorSink, Buffer, DeliveryScheduler, ErrorSink, MessengerError, NotificationSender,
};
use crate::infra::buffer::{InMemoryBuffer, SqliteBuffer};
use crate::infra::sender::{LogSender, MessageBirdSender, TwilioSender};
use crate::runtime::TokioTimer;

/// Open the configured buffer backend.
///
/// # Errors
///
/// [`MessengerError::Persistence`] when the SQLite file cannot be opened or migrated.
pub fn build_buffer(cfg: &BufferBackendConfig) -> Result<Arc<dyn Buffer>, MessengerError> {
    match cfg {
        BufferBackendConfig::InMemory => {
            info!("using in-memory buffer");
            Ok(Arc::new(InMemoryBuffer::new()))
        }
        BufferBackendConfig::Sqlite {
            path,
            busy_timeout_ms,
        } => {
            info!(path = %path.display(), "using sqlite buffer");
            let buffer = SqliteBuffer::open(path, Duration::from_millis(*busy_timeout_ms))?;
            Ok(Arc::new(buffer))
        }
    }
}

/// Create the configured notification sender.
pub fn build_sender(cfg: &SenderConfig, client: reqwest::Client) -> Arc<dyn NotificationSender> {
    match cfg {
        SenderConfig::Log => Arc::new(LogSender),
        SenderConfig::Twilio {
            account_sid,
            auth_token,
            api_base,
        } => Arc::new(
            TwilioSender::new(client, account_sid.as_str(), auth_token.as_str())
                .with_api_base(api_base.as_str()),
        ),
        SenderConfig::MessageBird {
            access_key,
            api_base,
        } => Arc::new(
            MessageBirdSender::new(client, access_key.as_str()).with_api_base(api_base.as_str()),
        ),
    }
}

/// Bounded error sink sized from configuration.
pub fn build_error_sink(cfg: &MessengerConfig) -> Arc<BoundedErrorSink> {
    Arc::new(BoundedErrorSink::new(cfg.error_sink_capacity))
}

/// Validate `cfg` and assemble a scheduler over the given components.
///
/// # Errors
///
/// [`MessengerError::Config`] when the configuration is invalid.
pub fn build_scheduler(
    cfg: &MessengerConfig,
    buffer: Arc<dyn Buffer>,
    sender: Arc<dyn NotificationSender>,
    errors: Arc<dyn ErrorSink>,
) -> Result<DeliveryScheduler<dyn Buffer, dyn NotificationSender, TokioTimer>, MessengerError> {
    cfg.validate()?;
    Ok(
        DeliveryScheduler::new(cfg.scheduler_settings(), buffer, sender, TokioTimer)
            .with_error_sink(errors),
    )
}

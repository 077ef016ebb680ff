//! Tokio-backed tick timer.

use std::time::Duration;

use async_trait::async_trait;

use crate::core::Timer;

/// Timer that sleeps on the tokio time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

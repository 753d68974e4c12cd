//! Notification channel trait.
//!
//! A [`Notifier`] implementation handles one delivery backend. The
//! dispatcher only ever sees this trait, so tests can substitute a
//! recording fake for the real transactional-email client.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from alert delivery.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    Api(String),
}

/// One-way operator notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert message.
    async fn notify(&self, subject: &str, body: &str) -> Result<(), AlertError>;

    /// Human-readable name for this channel backend, for logs.
    fn name(&self) -> &str;
}

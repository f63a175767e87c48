use async_trait::async_trait;
use thiserror::Error;

use super::models::Notification;

pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Delivers a single notification to its destination.
/// A message counts as delivered only when `send` returns `Ok`.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), SenderError>;
}

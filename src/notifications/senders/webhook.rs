use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use super::{NotificationSender, SenderError};
use crate::notifications::models::{Notification, WebhookPayload};

/// Posts notifications to a chat webhook.
pub struct WebhookSender {
    client: Client,
}

impl WebhookSender {
    pub fn new(timeout: Option<Duration>) -> Result<Self, SenderError> {
        let mut builder = Client::builder()
            .user_agent(format!("sitewatch/{}", crate::version::VERSION));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(&self, notification: &Notification) -> Result<(), SenderError> {
        let payload = WebhookPayload::from(notification);
        let request = self.client.post(&notification.webhook_url);

        // Files go out as multipart with the payload fields alongside.
        let request = match &notification.attachment {
            Some(attachment) => {
                let file = Part::bytes(attachment.bytes.clone())
                    .file_name(attachment.filename.clone())
                    .mime_str("text/html")?;
                let form = Form::new()
                    .text("username", payload.username.to_string())
                    .text("content", payload.content.to_string())
                    .part("file", file);
                request.multipart(form)
            }
            None => request.json(&payload),
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {}. Body: {}",
                status, error_body
            )));
        }

        Ok(())
    }
}

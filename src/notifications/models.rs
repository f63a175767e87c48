use serde::Serialize;

/// Prefix marking a message that is delivered after an earlier failure.
pub const RETRY_PREFIX: &str = "Retry: ";

/// A file sent along with a webhook message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// The page content attached to a content-change message.
    pub fn html(content: &str) -> Self {
        Self {
            filename: "content.html".to_string(),
            bytes: content.as_bytes().to_vec(),
        }
    }
}

/// One outbound webhook message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub webhook_url: String,
    pub username: String,
    pub content: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    /// The same message marked as a retry.
    pub fn as_retry(&self) -> Self {
        Self {
            content: format!("{RETRY_PREFIX}{}", self.content),
            ..self.clone()
        }
    }
}

/// JSON body of a webhook call; also sent as form fields when a file is attached.
#[derive(Serialize, Debug)]
pub struct WebhookPayload<'a> {
    pub username: &'a str,
    pub content: &'a str,
}

impl<'a> From<&'a Notification> for WebhookPayload<'a> {
    fn from(notification: &'a Notification) -> Self {
        Self {
            username: &notification.username,
            content: &notification.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_keeps_everything_but_content() {
        let original = Notification {
            webhook_url: "https://hooks.test/x".into(),
            username: "Website monitor".into(),
            content: "`https://a.test` changed status code to 500!".into(),
            attachment: Some(Attachment::html("<p>hi</p>")),
        };
        let retry = original.as_retry();
        assert_eq!(retry.content, "Retry: `https://a.test` changed status code to 500!");
        assert_eq!(retry.webhook_url, original.webhook_url);
        assert_eq!(retry.attachment, original.attachment);
    }

    #[test]
    fn payload_serializes_username_and_content() {
        let notification = Notification {
            webhook_url: "https://hooks.test/x".into(),
            username: "bot".into(),
            content: "hello".into(),
            attachment: None,
        };
        let value = serde_json::to_value(WebhookPayload::from(&notification)).unwrap();
        assert_eq!(value, serde_json::json!({"username": "bot", "content": "hello"}));
    }
}

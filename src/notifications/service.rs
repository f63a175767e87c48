use std::collections::VecDeque;
use tracing::{error, info, warn};

use super::models::Notification;
use super::senders::{NotificationSender, SenderError};

/// Sends notifications in order, holding back the ones that failed.
///
/// Every call first retries the held-back messages, oldest first and marked
/// as retries, and only then sends the new one. The backlog is capped; when
/// it is full the oldest message is dropped.
pub struct NotificationService {
    sender: Box<dyn NotificationSender>,
    pending: VecDeque<Notification>,
    queue_limit: usize,
}

impl NotificationService {
    pub fn new(sender: Box<dyn NotificationSender>, queue_limit: usize) -> Self {
        Self {
            sender,
            pending: VecDeque::new(),
            queue_limit: queue_limit.max(1),
        }
    }

    /// Messages waiting to be retried, oldest first.
    pub fn pending(&self) -> &VecDeque<Notification> {
        &self.pending
    }

    /// Delivers `notification` after any backlog. On failure the message is
    /// kept for the next call and the error is returned for logging only.
    pub async fn notify(&mut self, notification: Notification) -> Result<(), SenderError> {
        if let Err(e) = self.flush_pending().await {
            self.enqueue(notification);
            return Err(e);
        }

        match self.sender.send(&notification).await {
            Ok(()) => {
                info!(webhook_url = %notification.webhook_url, "Notification sent.");
                Ok(())
            }
            Err(e) => {
                error!(
                    webhook_url = %notification.webhook_url,
                    error = %e,
                    "Failed to send notification, queued for retry."
                );
                self.enqueue(notification);
                Err(e)
            }
        }
    }

    async fn flush_pending(&mut self) -> Result<(), SenderError> {
        while let Some(front) = self.pending.front() {
            let retry = front.as_retry();
            match self.sender.send(&retry).await {
                Ok(()) => {
                    info!(webhook_url = %retry.webhook_url, "Queued notification delivered.");
                    self.pending.pop_front();
                }
                Err(e) => {
                    error!(
                        webhook_url = %retry.webhook_url,
                        pending = self.pending.len(),
                        error = %e,
                        "Retry of queued notification failed."
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, notification: Notification) {
        if self.pending.len() >= self.queue_limit {
            if let Some(dropped) = self.pending.pop_front() {
                warn!(
                    limit = self.queue_limit,
                    content = %dropped.content,
                    "Notification queue is full, dropping the oldest message."
                );
            }
        }
        self.pending.push_back(notification);
    }
}

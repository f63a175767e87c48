use tracing::{debug, info};

use crate::monitor::config::TargetConfig;
use crate::monitor::fetcher::decode_content;
use crate::monitor::observation::{Observation, StatusOutcome};
use crate::notifications::models::{Attachment, Notification};
use crate::store::models::TargetState;

/// The outcome of comparing one observation with the stored baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The baseline to store for the next cycle.
    pub state: TargetState,
    pub is_first_check: bool,
    pub status_changed: bool,
    pub content_changed: bool,
    /// Content the observation was compared against; empty when untracked.
    pub previous_content: String,
    /// Decoded content of the observation; empty when untracked.
    pub current_content: String,
    pub notifications: Vec<Notification>,
}

impl Evaluation {
    /// Whether the target's state should count as modified this cycle.
    pub fn changed(&self) -> bool {
        self.is_first_check || self.status_changed || self.content_changed
    }
}

/// Compares `observation` with `previous` and builds the new baseline plus
/// the notifications `target` asks for.
///
/// A target seen for the first time starts from the observed status, so its
/// status never differs on that check. A status change on the first check is
/// skipped when `ignore_initial_status_check` is set, while a content
/// notification on the first check is sent only when it is set.
pub fn evaluate(
    target: &TargetConfig,
    previous: Option<&TargetState>,
    observation: &Observation,
) -> Evaluation {
    let is_first_check = previous.is_none();
    let mut state = previous
        .cloned()
        .unwrap_or_else(|| TargetState::new(observation.status.clone()));
    let mut notifications = Vec::new();

    let status_changed = observation.status != state.status
        && (!target.ignore_initial_status_check || !is_first_check);
    if status_changed {
        info!(
            url = %target.url,
            from = %state.status,
            to = %observation.status,
            "Status changed."
        );
        state.status = observation.status.clone();
        if target.use_webhook_on_status_change {
            notifications.push(status_notification(target, &observation.status));
        }
    }

    let mut content_changed = false;
    let mut previous_content = String::new();
    let mut current_content = String::new();
    if target.check_content_changes {
        current_content = decode_content(observation, &target.url);
        previous_content = state.content.get_or_insert_with(String::new).clone();

        if current_content != previous_content {
            info!(url = %target.url, "Content changed.");
            state.content = Some(current_content.clone());
            content_changed = true;
            if target.use_webhook_on_content_change
                && (target.ignore_initial_status_check || !is_first_check)
            {
                notifications.push(content_notification(target, &current_content));
            }
        }
    }

    if !status_changed && !content_changed {
        debug!(url = %target.url, first = is_first_check, "No change detected.");
    }

    Evaluation {
        state,
        is_first_check,
        status_changed,
        content_changed,
        previous_content,
        current_content,
        notifications,
    }
}

pub fn status_message(url: &str, status: &StatusOutcome, ping: bool) -> String {
    if ping {
        format!("@everyone `{url}` changed status code to {status}!")
    } else {
        format!("`{url}` changed status code to {status}!")
    }
}

pub fn content_message(url: &str) -> String {
    format!("Content of {url} has changed.")
}

fn status_notification(target: &TargetConfig, status: &StatusOutcome) -> Notification {
    Notification {
        webhook_url: target.webhook_url.clone(),
        username: target.webhook_username.clone(),
        content: status_message(&target.url, status, target.ping_on_status_change),
        attachment: None,
    }
}

fn content_notification(target: &TargetConfig, content: &str) -> Notification {
    Notification {
        webhook_url: target.webhook_url.clone(),
        username: target.webhook_username.clone(),
        content: content_message(&target.url),
        attachment: Some(Attachment::html(content)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetConfig {
        TargetConfig {
            url: "http://a.test".to_string(),
            require_ssl_certificate: true,
            check_content_changes: false,
            use_webhook_on_status_change: true,
            use_webhook_on_content_change: false,
            ping_on_status_change: false,
            ignore_initial_status_check: true,
            webhook_username: "Website monitor".to_string(),
            webhook_url: "https://hooks.test/1".to_string(),
        }
    }

    fn observed(status: u16, body: Option<&str>) -> Observation {
        Observation {
            status: StatusOutcome::Code(status),
            content: body.map(|b| b.as_bytes().to_vec()),
            content_encoding_hint: None,
        }
    }

    #[test]
    fn first_check_creates_state_without_notification() {
        let evaluation = evaluate(&target(), None, &observed(200, None));
        assert!(evaluation.is_first_check);
        assert!(evaluation.changed());
        assert!(!evaluation.status_changed);
        assert!(evaluation.notifications.is_empty());
        assert_eq!(evaluation.state, TargetState::new(StatusOutcome::Code(200)));
    }

    #[test]
    fn status_change_after_first_check_notifies_plainly() {
        let first = evaluate(&target(), None, &observed(200, None));
        let second = evaluate(&target(), Some(&first.state), &observed(500, None));

        assert!(!second.is_first_check);
        assert!(second.status_changed);
        assert_eq!(second.state.status, StatusOutcome::Code(500));
        assert_eq!(second.notifications.len(), 1);
        let notification = &second.notifications[0];
        assert_eq!(notification.content, "`http://a.test` changed status code to 500!");
        assert_eq!(notification.webhook_url, "https://hooks.test/1");
        assert_eq!(notification.username, "Website monitor");
        assert!(notification.attachment.is_none());
    }

    #[test]
    fn ping_uses_everyone_mention() {
        let mut target = target();
        target.ping_on_status_change = true;
        let previous = TargetState::new(StatusOutcome::Code(200));
        let evaluation = evaluate(&target, Some(&previous), &Observation::unreachable("timed out"));

        assert_eq!(
            evaluation.notifications[0].content,
            "@everyone `http://a.test` changed status code to Error:timed out!"
        );
    }

    #[test]
    fn unchanged_status_is_quiet() {
        let previous = TargetState::new(StatusOutcome::Code(200));
        let evaluation = evaluate(&target(), Some(&previous), &observed(200, None));
        assert!(!evaluation.changed());
        assert!(evaluation.notifications.is_empty());
        assert_eq!(evaluation.previous_content, "");
        assert_eq!(evaluation.current_content, "");
    }

    #[test]
    fn status_webhook_disabled_updates_state_only() {
        let mut target = target();
        target.use_webhook_on_status_change = false;
        let previous = TargetState::new(StatusOutcome::Code(200));
        let evaluation = evaluate(&target, Some(&previous), &observed(404, None));
        assert!(evaluation.status_changed);
        assert!(evaluation.notifications.is_empty());
    }

    #[test]
    fn content_change_attaches_new_content() {
        let mut target = target();
        target.check_content_changes = true;
        target.use_webhook_on_content_change = true;
        let previous = TargetState {
            status: StatusOutcome::Code(200),
            content: Some("<p>old</p>".into()),
        };

        let evaluation = evaluate(&target, Some(&previous), &observed(200, Some("<p>new</p>")));

        assert!(evaluation.content_changed);
        assert_eq!(evaluation.previous_content, "<p>old</p>");
        assert_eq!(evaluation.state.content.as_deref(), Some("<p>new</p>"));
        assert_eq!(evaluation.notifications.len(), 1);
        let notification = &evaluation.notifications[0];
        assert_eq!(notification.content, "Content of http://a.test has changed.");
        assert_eq!(notification.attachment, Some(Attachment::html("<p>new</p>")));
    }

    #[test]
    fn edits_on_undeclared_legacy_pages_are_detected() {
        let mut target = target();
        target.check_content_changes = true;
        let legacy = |body: &[u8]| Observation {
            status: StatusOutcome::Code(200),
            content: Some(body.to_vec()),
            content_encoding_hint: None,
        };

        let v1 = legacy(&b"<p>Le caf\xe9 est ferm\xe9 \xe0 midi, v1</p>"[..]);
        let v2 = legacy(&b"<p>Le caf\xe9 est ferm\xe9 \xe0 midi, v2</p>"[..]);

        let first = evaluate(&target, None, &v1);
        assert!(first.content_changed);
        assert_eq!(first.current_content, "<p>Le café est fermé à midi, v1</p>");

        let second = evaluate(&target, Some(&first.state), &v2);
        assert!(second.content_changed);
        assert_eq!(second.previous_content, "<p>Le café est fermé à midi, v1</p>");
        assert_eq!(second.current_content, "<p>Le café est fermé à midi, v2</p>");
    }

    #[test]
    fn tracked_content_is_initialized_when_missing() {
        let mut target = target();
        target.check_content_changes = true;
        let previous = TargetState::new(StatusOutcome::Code(200));

        let evaluation = evaluate(&target, Some(&previous), &observed(200, Some("")));
        assert!(!evaluation.changed());
        assert_eq!(evaluation.state.content.as_deref(), Some(""));
    }

    // The two gates treat the first check differently; both are kept as is.
    #[test]
    fn first_check_gating_differs_between_status_and_content() {
        let mut target = target();
        target.check_content_changes = true;
        target.use_webhook_on_content_change = true;

        target.ignore_initial_status_check = true;
        let ignoring = evaluate(&target, None, &observed(200, Some("<p>hi</p>")));
        assert!(ignoring.content_changed);
        assert_eq!(ignoring.notifications.len(), 1);
        assert_eq!(ignoring.notifications[0].content, "Content of http://a.test has changed.");

        target.ignore_initial_status_check = false;
        let not_ignoring = evaluate(&target, None, &observed(200, Some("<p>hi</p>")));
        assert!(not_ignoring.content_changed);
        assert!(not_ignoring.notifications.is_empty());
    }

    #[test]
    fn untracked_content_never_changes() {
        let previous = TargetState {
            status: StatusOutcome::Code(200),
            content: Some("stale".into()),
        };
        let evaluation = evaluate(&target(), Some(&previous), &observed(200, Some("fresh")));
        assert!(!evaluation.content_changed);
        assert_eq!(evaluation.state.content.as_deref(), Some("stale"));
    }
}

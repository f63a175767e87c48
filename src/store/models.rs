use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::monitor::observation::StatusOutcome;

/// Last known observation of a URL, used as the comparison baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetState {
    #[serde(rename = "status_code")]
    pub status: StatusOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl TargetState {
    pub fn new(status: StatusOutcome) -> Self {
        Self {
            status,
            content: None,
        }
    }
}

/// The persisted state file: one entry per URL ever seen, plus the reserved
/// `script_exit` key written only by the last snapshot before an exit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_exit: Option<String>,
    #[serde(flatten)]
    pub targets: BTreeMap<String, TargetState>,
}

/// One recorded content change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub timestamp: String,
    #[serde(rename = "status_code")]
    pub status: StatusOutcome,
    pub diff: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StateSnapshot {
        let mut snapshot = StateSnapshot::default();
        snapshot.targets.insert(
            "https://a.test".into(),
            TargetState {
                status: StatusOutcome::Code(200),
                content: Some("<html>\nhi\n</html>".into()),
            },
        );
        snapshot.targets.insert(
            "https://b.test".into(),
            TargetState::new(StatusOutcome::Unreachable("dns error".into())),
        );
        snapshot
    }

    #[test]
    fn snapshot_round_trips_without_exit_marker() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("script_exit"));
        let back: StateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn snapshot_round_trips_with_exit_marker() {
        let mut snapshot = sample();
        snapshot.script_exit = Some("Interrupted".into());
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: StateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert!(!back.targets.contains_key("script_exit"));
    }

    #[test]
    fn reads_flat_state_file_layout() {
        let json = r#"{
            "https://a.test": {"status_code": 404},
            "https://b.test": {"status_code": "Error:timed out", "content": ""},
            "script_exit": "boom"
        }"#;
        let snapshot: StateSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.script_exit.as_deref(), Some("boom"));
        assert_eq!(
            snapshot.targets["https://a.test"],
            TargetState::new(StatusOutcome::Code(404))
        );
        assert_eq!(
            snapshot.targets["https://b.test"].content.as_deref(),
            Some("")
        );
    }

    #[test]
    fn diff_entry_uses_status_code_key() {
        let entry = DiffEntry {
            timestamp: "2024-01-01T00:00:00+00:00".into(),
            status: StatusOutcome::Code(200),
            diff: vec!["+ new".into()],
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status_code"], 200);
        assert_eq!(value["diff"][0], "+ new");
    }
}

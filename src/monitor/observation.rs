use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Prefix used when an unreachable outcome is written as a status string.
const UNREACHABLE_PREFIX: &str = "Error:";

/// Outcome of probing a URL: either the HTTP status that reached the client,
/// or the reason the request never produced one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Code(u16),
    Unreachable(String),
}

impl StatusOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, StatusOutcome::Code(_))
    }
}

impl fmt::Display for StatusOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusOutcome::Code(code) => write!(f, "{code}"),
            StatusOutcome::Unreachable(reason) => write!(f, "{UNREACHABLE_PREFIX}{reason}"),
        }
    }
}

// Persisted as a bare number for real responses and as "Error:<reason>" otherwise.
impl Serialize for StatusOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatusOutcome::Code(code) => serializer.serialize_u16(*code),
            StatusOutcome::Unreachable(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Code(u16),
    Text(String),
}

impl<'de> Deserialize<'de> for StatusOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawStatus::deserialize(deserializer)? {
            RawStatus::Code(code) => StatusOutcome::Code(code),
            RawStatus::Text(text) => match text.strip_prefix(UNREACHABLE_PREFIX) {
                Some(reason) => StatusOutcome::Unreachable(reason.to_string()),
                None => StatusOutcome::Unreachable(text),
            },
        })
    }
}

/// The result of probing a target once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub status: StatusOutcome,
    /// Raw body; only kept for targets that track content.
    pub content: Option<Vec<u8>>,
    /// Charset declared by the server, if any.
    pub content_encoding_hint: Option<String>,
}

impl Observation {
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            status: StatusOutcome::Unreachable(reason.into()),
            content: None,
            content_encoding_hint: None,
        }
    }
}

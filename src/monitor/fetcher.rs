use tracing::{debug, warn};

use super::config::TargetConfig;
use super::encoding::decode_body;
use super::observation::{Observation, StatusOutcome};
use super::transport::HttpTransport;

/// Probes a target once. Transport failures come back as an
/// `Unreachable` observation; this never returns an error.
pub async fn fetch(transport: &dyn HttpTransport, target: &TargetConfig) -> Observation {
    match transport
        .get(&target.url, target.require_ssl_certificate)
        .await
    {
        Ok(response) => Observation {
            status: StatusOutcome::Code(response.status),
            content: target.check_content_changes.then_some(response.body),
            content_encoding_hint: response.charset,
        },
        Err(e) => {
            warn!(url = %target.url, error = %e, "Target is unreachable.");
            Observation::unreachable(e.to_string())
        }
    }
}

/// Decodes the observed body to text. A body that cannot be decoded is
/// logged and treated as empty.
pub fn decode_content(observation: &Observation, url: &str) -> String {
    let Some(bytes) = observation.content.as_deref() else {
        return String::new();
    };
    let hint = observation.content_encoding_hint.as_deref();
    match decode_body(bytes, hint) {
        Ok(text) => {
            debug!(%url, declared = hint.unwrap_or("none"), "Decoded response content.");
            text
        }
        Err(e) => {
            warn!(%url, error = %e, "Error decoding response content, using empty content.");
            String::new()
        }
    }
}

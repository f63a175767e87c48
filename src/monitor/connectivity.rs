//! Connectivity gate: holds the loop until the monitoring host itself is online.
use std::time::Duration;
use tracing::{debug, info, warn};

use super::shutdown::{Cancelled, ShutdownSignal};
use super::transport::HttpTransport;

/// A change of the host's connectivity as seen by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityTransition {
    Offline { error: String },
    Online { status: u16 },
}

pub struct ConnectivityGate {
    reference_url: String,
    poll_interval: Duration,
}

impl ConnectivityGate {
    pub fn new(reference_url: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            reference_url: reference_url.into(),
            poll_interval,
        }
    }

    pub fn reference_url(&self) -> &str {
        &self.reference_url
    }

    /// Polls the reference URL until any response arrives.
    ///
    /// Only a transport failure counts as offline. The first failure is
    /// reported once; later failures stay quiet until the host is back, which
    /// is always reported together with the status that was observed.
    pub async fn wait_until_online(
        &self,
        transport: &dyn HttpTransport,
        shutdown: &mut ShutdownSignal,
    ) -> Result<Vec<ConnectivityTransition>, Cancelled> {
        let mut transitions = Vec::new();
        let mut offline_reported = false;

        loop {
            match transport.get(&self.reference_url, true).await {
                Ok(response) => {
                    info!(
                        reference_url = %self.reference_url,
                        status = response.status,
                        "We are online!"
                    );
                    transitions.push(ConnectivityTransition::Online {
                        status: response.status,
                    });
                    return Ok(transitions);
                }
                Err(e) => {
                    if offline_reported {
                        debug!(reference_url = %self.reference_url, error = %e, "Still offline.");
                    } else {
                        warn!(
                            reference_url = %self.reference_url,
                            error = %e,
                            "We are offline! Waiting for internet access."
                        );
                        transitions.push(ConnectivityTransition::Offline {
                            error: e.to_string(),
                        });
                        offline_reported = true;
                    }
                }
            }
            shutdown.sleep(self.poll_interval).await?;
        }
    }
}

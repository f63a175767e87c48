use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::StoreError;
use super::models::StateSnapshot;

/// The state file holding the last known status and content per URL.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot. A missing or unreadable file yields an empty one.
    pub fn load(&self) -> StateSnapshot {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = ?self.path, "No previous state found, starting fresh.");
                return StateSnapshot::default();
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to read state file, starting fresh.");
                return StateSnapshot::default();
            }
        };
        match serde_json::from_str::<StateSnapshot>(&contents) {
            Ok(snapshot) => {
                debug!(path = ?self.path, targets = snapshot.targets.len(), "Loaded previous state.");
                snapshot
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "State file is corrupt, starting fresh.");
                StateSnapshot::default()
            }
        }
    }

    /// Overwrites the state file with `snapshot`.
    pub fn save(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        let serialized = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, serialized).map_err(|e| StoreError::io(&self.path, e))?;
        debug!(path = ?self.path, "State saved.");
        Ok(())
    }
}

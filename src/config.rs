//! Organizer settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Session-level settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// Display name given to the reserved `owned` bucket on first load.
    pub owned_bucket_name: String,
    /// Display name given to the reserved `unowned` bucket on first load.
    pub unowned_bucket_name: String,
    /// Whether the selection is saved alongside the buckets.
    pub persist_selection: bool,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            owned_bucket_name: "Owned Cards".to_string(),
            unowned_bucket_name: "Proxies Needed".to_string(),
            persist_selection: true,
        }
    }
}

impl OrganizerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

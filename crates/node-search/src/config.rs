//! Search configuration storage
//!
//! Handles persistent storage of the identifier grammar used to classify
//! queries and the buffer size of change feed subscriptions.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;
use crate::events::{BroadcastNodeFeed, DEFAULT_EVENT_BUFFER};
use crate::query::{IdPattern, DEFAULT_ID_PATTERN};

/// File name of the search configuration inside the config directory
pub const CONFIG_FILE: &str = "search.json";

fn default_id_pattern() -> String {
    DEFAULT_ID_PATTERN.to_string()
}

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER
}

/// Search configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Regex a lowercased query must match to be searched by identifier
    #[serde(default = "default_id_pattern")]
    pub id_pattern: String,
    /// Capacity of each change feed subscription's buffer (at least 1)
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            id_pattern: default_id_pattern(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl SearchConfig {
    /// Load configuration from disk
    ///
    /// A missing file yields the defaults.
    pub async fn load(config_dir: &Path) -> std::result::Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await?;

        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, config_dir: &Path) -> std::result::Result<(), ConfigError> {
        fs::create_dir_all(config_dir).await?;

        let config_path = config_dir.join(CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(&config_path, contents).await?;

        log::info!("Search configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Compile the configured identifier pattern
    pub fn id_pattern(&self) -> Result<IdPattern> {
        IdPattern::new(&self.id_pattern)
    }

    /// Configured event buffer size, floored at 1
    pub fn event_buffer_size(&self) -> usize {
        self.event_buffer_size.max(1)
    }

    /// Create a change feed using the configured buffer size
    pub fn change_feed<E: Clone + Send + 'static>(&self) -> BroadcastNodeFeed<E> {
        BroadcastNodeFeed::with_buffer(self.event_buffer_size())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}

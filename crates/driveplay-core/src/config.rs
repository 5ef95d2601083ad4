//! Controller configuration

use crate::{strategy::StrategyTable, types::PlayableItem, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default target of the "open externally" action
pub const DEFAULT_EXTERNAL_URL: &str = "https://www.youtube.com/@ApnaCollegeOfficial";

/// Where "open externally" points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalLinkPolicy {
    /// Always the configured external URL, whatever is playing
    Fixed,
    /// The active item's own viewer link, or the configured URL if it has none
    ActiveItem,
}

/// Playlist controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Pause between natural end of an item and advancing to the next one
    pub auto_advance_delay_ms: u64,
    /// Per-attempt load timeout; `None` waits for the surface indefinitely
    pub load_timeout_ms: Option<u64>,
    /// URL shapes for each delivery strategy
    pub strategies: StrategyTable,
    /// Escape hatch offered next to the player and on exhaustion
    pub external_url: Url,
    /// How the external link is chosen
    pub external_link_policy: ExternalLinkPolicy,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay_ms: 1000,
            load_timeout_ms: Some(8000),
            strategies: StrategyTable::default(),
            external_url: Url::parse(DEFAULT_EXTERNAL_URL)
                .expect("static external URL is valid"),
            external_link_policy: ExternalLinkPolicy::Fixed,
            event_capacity: 256,
        }
    }
}

impl ControllerConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ControllerConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.load_timeout_ms == Some(0) {
            return Err(Error::InvalidConfig("load_timeout_ms must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig("event_capacity must be positive".into()));
        }
        self.strategies.validate()
    }

    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    /// Resolve the "open externally" target for the given active item
    pub fn external_link_for(&self, active: Option<&PlayableItem>) -> Url {
        match self.external_link_policy {
            ExternalLinkPolicy::Fixed => self.external_url.clone(),
            ExternalLinkPolicy::ActiveItem => active
                .and_then(|item| item.web_view_link.clone())
                .unwrap_or_else(|| self.external_url.clone()),
        }
    }
}

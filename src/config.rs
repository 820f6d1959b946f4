//! Runtime settings, loaded from an optional YAML file.
//!
//! Every field has a default, so an empty or partial file is valid. CLI flags
//! are applied on top in `main`.
//!
//! ```yaml
//! interval_secs: 60
//! items_per_source: 10
//! store_path: ./data/news.jsonl
//! http:
//!   page_timeout_secs: 15
//!   accept_language: "tr-TR,tr;q=0.9"
//! politeness:
//!   item_delay_ms: 1000
//!   source_delay_ms: 2000
//! ```

use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/127.0.0.0 Safari/537.36"
);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub interval_secs: u64,
    pub items_per_source: usize,
    pub store_path: String,
    pub default_category: String,
    pub http: HttpSettings,
    pub politeness: PolitenessSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub feed_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolitenessSettings {
    pub item_delay_ms: u64,
    /// Uniform +/- spread applied to `item_delay_ms`.
    pub item_jitter_ms: u64,
    pub source_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            items_per_source: 10,
            store_path: "./data/news.jsonl".to_string(),
            default_category: "agenda".to_string(),
            http: HttpSettings::default(),
            politeness: PolitenessSettings::default(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            feed_timeout_secs: 15,
            page_timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "tr-TR,tr;q=0.9,en;q=0.5".to_string(),
        }
    }
}

impl Default for PolitenessSettings {
    fn default() -> Self {
        Self {
            item_delay_ms: 1000,
            item_jitter_ms: 500,
            source_delay_ms: 2000,
        }
    }
}

impl HttpSettings {
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

impl Settings {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let settings: Settings =
            serde_yaml::from_str(text).map_err(|e| IngestError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let settings = Self::from_yaml(&text)?;
        info!(?settings, "Loaded settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(IngestError::Config("interval_secs must be > 0".into()));
        }
        if self.items_per_source == 0 {
            return Err(IngestError::Config("items_per_source must be > 0".into()));
        }
        if self.http.feed_timeout_secs == 0 || self.http.page_timeout_secs == 0 {
            return Err(IngestError::Config("HTTP timeouts must be > 0".into()));
        }
        if self.politeness.item_jitter_ms > self.politeness.item_delay_ms {
            return Err(IngestError::Config(
                "item_jitter_ms cannot exceed item_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

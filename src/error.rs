//! Error kinds raised by the ingestion pipeline.
//!
//! Only source-level and item-level code ever sees these; a pass itself never
//! fails. A page that yields too little text is not an error at all, it is an
//! extraction miss and is counted in [`crate::models::RunStats`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("malformed feed {url}: {reason}")]
    Feed { url: String, reason: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("category resolution error: {0}")]
    CategoryResolution(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngestError {
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IngestError::Timeout {
                url: url.to_string(),
            }
        } else {
            IngestError::Fetch {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, IngestError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

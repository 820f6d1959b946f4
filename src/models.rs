//! Data models shared across the ingestion pipeline.
//!
//! - [`FeedSource`]: one static registry entry
//! - [`CandidateItem`]: a parsed feed entry, discarded after processing
//! - [`NewArticle`] / [`ArticleRecord`]: what gets written and what comes back
//! - [`Category`]: one taxonomy entry
//! - [`ExtractionResult`]: the folded outcome of full-text extraction
//! - [`RunStats`]: counters returned by a single ingestion pass

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A feed to poll, the category slug its items belong to, and the outlet name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSource {
    pub feed_url: &'static str,
    pub category_slug: &'static str,
    pub source_name: &'static str,
}

/// An entry parsed out of a feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateItem {
    pub title: String,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// `<description>` / Atom `<summary>`, still HTML.
    pub raw_description: String,
    /// `content:encoded` / Atom `<content>`, still HTML.
    pub content_encoded: String,
    pub media_url: Option<String>,
    pub author: Option<String>,
}

impl CandidateItem {
    /// The richest body the feed offers, preferring `content:encoded`.
    pub fn raw_body(&self) -> &str {
        if !self.content_encoded.trim().is_empty() {
            &self.content_encoded
        } else {
            &self.raw_description
        }
    }

    pub fn trimmed_title(&self) -> &str {
        self.title.trim()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Fields for an article that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub description: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub source_name: String,
    pub author: String,
    pub category_slug: String,
    pub published_at: DateTime<Utc>,
    pub external_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub description: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub source_name: String,
    pub author: String,
    pub category_slug: String,
    pub published_at: DateTime<Utc>,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn from_new(id: i64, new: NewArticle, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            content: new.content,
            description: new.description,
            image_url: new.image_url,
            source_url: new.source_url,
            source_name: new.source_name,
            author: new.author,
            category_slug: new.category_slug,
            published_at: new.published_at,
            external_id: new.external_id,
            created_at,
        }
    }
}

/// Extracted text only wins when it adds this many characters over the feed summary.
pub const MIN_EXTRACTION_GAIN: usize = 100;

/// What ends up in `ArticleRecord.content`. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    pub succeeded: bool,
}

impl ExtractionResult {
    /// Fold the extractor output with the feed-provided fallbacks.
    pub fn fold(extracted: Option<String>, description: &str, title: &str) -> Self {
        let description = description.trim();
        if let Some(text) = extracted {
            let text = text.trim();
            if text.chars().count() > description.chars().count() + MIN_EXTRACTION_GAIN {
                return Self {
                    text: text.to_string(),
                    succeeded: true,
                };
            }
        }
        let text = if description.is_empty() {
            title.trim().to_string()
        } else {
            description.to_string()
        };
        Self {
            text,
            succeeded: false,
        }
    }
}

/// Counters for one ingestion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub saved: usize,
    pub skipped: usize,
    pub errored: usize,
    pub extraction_misses: usize,
    pub sources_failed: usize,
}

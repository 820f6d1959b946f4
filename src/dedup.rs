//! Fingerprints and the "have we stored this already?" check.

use crate::error::Result;
use crate::models::{ArticleRecord, CandidateItem};
use crate::store::PersistenceGateway;
use sha2::{Digest, Sha256};
use tracing::debug;

/// The string a fingerprint is hashed from: guid, else link, else `source-title`.
pub fn fingerprint_key(item: &CandidateItem, source_name: &str) -> String {
    let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    non_empty(&item.guid)
        .or_else(|| non_empty(&item.link))
        .unwrap_or_else(|| format!("{}-{}", source_name, item.trimmed_title()))
}

/// Lowercase hex SHA-256 of [`fingerprint_key`].
pub fn fingerprint(item: &CandidateItem, source_name: &str) -> String {
    format!("{:x}", Sha256::digest(fingerprint_key(item, source_name).as_bytes()))
}

/// The stored record matching either the fingerprint or the exact trimmed title.
pub async fn find_existing(
    gateway: &dyn PersistenceGateway,
    fingerprint: &str,
    item: &CandidateItem,
) -> Result<Option<ArticleRecord>> {
    let existing = gateway.find_article(fingerprint, item.trimmed_title()).await?;
    if let Some(record) = &existing {
        debug!(id = record.id, %fingerprint, "Already stored");
    }
    Ok(existing)
}

//! Persistence gateway: where articles, categories, and their links live.
//!
//! The pipeline only talks to [`PersistenceGateway`]. Two backends ship with
//! the crate:
//!
//! - [`MemoryStore`]: process-local, used by tests and `--dry-run`
//! - [`JsonFileStore`]: the same state backed by an append-only JSON-lines log

use crate::error::Result;
use crate::models::{ArticleRecord, Category, NewArticle};
use async_trait::async_trait;

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// A stored article whose `external_id` equals `fingerprint` or whose
    /// trimmed title equals `title`.
    async fn find_article(&self, fingerprint: &str, title: &str) -> Result<Option<ArticleRecord>>;

    /// Insert a new article. Fails if the `external_id` is already taken.
    async fn create_article(&self, article: NewArticle) -> Result<ArticleRecord>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Link an article to categories. Existing links are left untouched.
    async fn associate_categories(&self, article_id: i64, category_ids: &[i64]) -> Result<()>;

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
}

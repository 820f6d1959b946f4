use crate::error::{IngestError, Result};
use crate::models::{ArticleRecord, Category, NewArticle};
use crate::sources::DEFAULT_TAXONOMY;
use crate::store::PersistenceGateway;
use async_trait::async_trait;
use chrono::Utc;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything a store holds. [`super::JsonFileStore`] keeps one in memory and
/// replays its log into it on open.
#[derive(Debug, Default, Clone)]
pub struct StoreState {
    pub articles: Vec<ArticleRecord>,
    pub categories: Vec<Category>,
    /// `(article_id, category_id)` pairs.
    pub associations: BTreeSet<(i64, i64)>,
    next_article_id: i64,
}

impl StoreState {
    pub fn with_categories(categories: Vec<Category>) -> Self {
        Self {
            categories,
            ..Default::default()
        }
    }

    /// State seeded with the built-in taxonomy, ids starting at 1.
    pub fn seeded() -> Self {
        let categories = DEFAULT_TAXONOMY
            .iter()
            .zip(1..)
            .map(|((slug, name), id)| Category {
                id,
                slug: slug.to_string(),
                name: name.to_string(),
                description: None,
            })
            .collect();
        Self::with_categories(categories)
    }

    pub fn find_article(&self, fingerprint: &str, title: &str) -> Option<ArticleRecord> {
        let title = title.trim();
        self.articles
            .iter()
            .find(|a| a.external_id == fingerprint || (!title.is_empty() && a.title.trim() == title))
            .cloned()
    }

    /// Check `article` and give it the next id, without storing it.
    pub fn prepare_article(&self, article: NewArticle) -> Result<ArticleRecord> {
        if self.articles.iter().any(|a| a.external_id == article.external_id) {
            return Err(IngestError::Persistence(format!(
                "duplicate external_id {}",
                article.external_id
            )));
        }
        let id = self
            .next_article_id
            .max(self.articles.iter().map(|a| a.id).max().unwrap_or(0))
            + 1;
        Ok(ArticleRecord::from_new(id, article, Utc::now()))
    }

    pub fn insert_article(&mut self, record: ArticleRecord) {
        self.next_article_id = self.next_article_id.max(record.id);
        self.articles.push(record);
    }

    pub fn create_article(&mut self, article: NewArticle) -> Result<ArticleRecord> {
        let record = self.prepare_article(article)?;
        self.insert_article(record.clone());
        Ok(record)
    }

    /// The links `associate` would add: validated, minus the ones already present.
    pub fn new_links(&self, article_id: i64, category_ids: &[i64]) -> Result<Vec<(i64, i64)>> {
        if !self.articles.iter().any(|a| a.id == article_id) {
            return Err(IngestError::Persistence(format!("no article with id {article_id}")));
        }
        if let Some(missing) = category_ids
            .iter()
            .find(|id| !self.categories.iter().any(|c| c.id == **id))
        {
            return Err(IngestError::Persistence(format!("no category with id {missing}")));
        }
        Ok(category_ids
            .iter()
            .map(|cid| (article_id, *cid))
            .filter(|link| !self.associations.contains(link))
            .unique()
            .collect())
    }

    pub fn associate(&mut self, article_id: i64, category_ids: &[i64]) -> Result<()> {
        let links = self.new_links(article_id, category_ids)?;
        self.associations.extend(links);
        Ok(())
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<Category> {
        self.categories.iter().find(|c| c.slug == slug).cloned()
    }

    pub fn categories_of(&self, article_id: i64) -> Vec<i64> {
        self.associations
            .range((article_id, i64::MIN)..=(article_id, i64::MAX))
            .map(|(_, cid)| *cid)
            .collect()
    }
}

/// In-process store behind a `tokio` lock. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn seeded() -> Self {
        Self::from_state(StoreState::seeded())
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryStore {
    async fn find_article(&self, fingerprint: &str, title: &str) -> Result<Option<ArticleRecord>> {
        Ok(self.state.read().await.find_article(fingerprint, title))
    }

    async fn create_article(&self, article: NewArticle) -> Result<ArticleRecord> {
        self.state.write().await.create_article(article)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.state.read().await.categories.clone())
    }

    async fn associate_categories(&self, article_id: i64, category_ids: &[i64]) -> Result<()> {
        self.state.write().await.associate(article_id, category_ids)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self.state.read().await.category_by_slug(slug))
    }
}

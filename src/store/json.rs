//! Append-only JSON-lines store.
//!
//! Each mutation appends one line per fact (a category, an article, or an
//! article/category link) to the log and only then updates the in-memory
//! [`StoreState`]. Opening replays the log. A new or untidy log is compacted by
//! writing `<path>.tmp` and renaming it over `<path>`.

use crate::error::{IngestError, Result};
use crate::models::{ArticleRecord, Category, NewArticle};
use crate::store::PersistenceGateway;
use crate::store::memory::StoreState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntry {
    Category(Category),
    Article(ArticleRecord),
    Link { article_id: i64, category_id: i64 },
}

fn encode(entries: &[LogEntry]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut buf, entry)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

/// Every fact in `state`, in replay order.
fn entries_of(state: &StoreState) -> Vec<LogEntry> {
    let categories = state.categories.iter().cloned().map(LogEntry::Category);
    let articles = state.articles.iter().cloned().map(LogEntry::Article);
    let links = state
        .associations
        .iter()
        .map(|&(article_id, category_id)| LogEntry::Link {
            article_id,
            category_id,
        });
    categories.chain(articles).chain(links).collect()
}

#[derive(Debug, Default)]
struct Replay {
    state: StoreState,
    /// Lines that added nothing (repeated links).
    redundant: usize,
    /// A final line cut short by an interrupted write.
    torn_tail: bool,
}

fn replay(text: &str) -> Result<Replay> {
    let mut out = Replay::default();
    let lines: Vec<&str> = text.split('\n').collect();
    let last = lines.len().saturating_sub(1);

    for (n, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: LogEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            // only an unterminated last line can be a partial append
            Err(e) if n == last => {
                warn!(line = n + 1, error = %e, "Dropping partial last log line");
                out.torn_tail = true;
                break;
            }
            Err(e) => return Err(e.into()),
        };
        match entry {
            LogEntry::Category(c) => out.state.categories.push(c),
            LogEntry::Article(a) => out.state.insert_article(a),
            LogEntry::Link {
                article_id,
                category_id,
            } => {
                if !out.state.associations.insert((article_id, category_id)) {
                    out.redundant += 1;
                }
            }
        }
    }
    Ok(out)
}

#[derive(Debug)]
struct Inner {
    state: StoreState,
    /// Length of the log up to its last complete append.
    log_len: u64,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: RwLock<Inner>,
}

impl JsonFileStore {
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (state, log_len) = match fs::read_to_string(&path).await {
            Ok(text) => {
                let Replay {
                    state,
                    redundant,
                    torn_tail,
                } = replay(&text)?;
                info!(
                    articles = state.articles.len(),
                    categories = state.categories.len(),
                    links = state.associations.len(),
                    "Opened store"
                );
                let log_len = if torn_tail || redundant > 0 {
                    info!(redundant, torn_tail, "Compacting store log");
                    compact(&path, &state).await?
                } else {
                    text.len() as u64
                };
                (state, log_len)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let state = StoreState::seeded();
                let log_len = compact(&path, &state).await?;
                info!(categories = state.categories.len(), "Created new store with default taxonomy");
                (state, log_len)
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner: RwLock::new(Inner { state, log_len }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn article_count(&self) -> usize {
        self.inner.read().await.state.articles.len()
    }

    /// Append whole lines to the log. On failure the log is cut back to its
    /// last good length so a partial line never precedes later appends.
    async fn append(&self, inner: &mut Inner, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let bytes = encode(entries)?;
        match write_lines(&self.path, &bytes).await {
            Ok(()) => {
                inner.log_len += bytes.len() as u64;
                debug!(path = %self.path.display(), lines = entries.len(), "Appended to store log");
                Ok(())
            }
            Err(e) => {
                if let Err(trunc) = truncate(&self.path, inner.log_len).await {
                    warn!(path = %self.path.display(), error = %trunc, "Could not trim failed append");
                }
                Err(IngestError::Persistence(format!(
                    "appending to {}: {e}",
                    self.path.display()
                )))
            }
        }
    }
}

async fn write_lines(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(bytes).await?;
    file.flush().await
}

async fn truncate(path: &Path, len: u64) -> std::io::Result<()> {
    let file = OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await
}

/// Rewrite the log as exactly the facts in `state`. Returns the new length.
async fn compact(path: &Path, state: &StoreState) -> Result<u64> {
    let bytes = encode(&entries_of(state))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, &bytes)
        .await
        .map_err(|e| IngestError::Persistence(format!("writing {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| IngestError::Persistence(format!("replacing {}: {e}", path.display())))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Store log compacted");
    Ok(bytes.len() as u64)
}

#[async_trait]
impl PersistenceGateway for JsonFileStore {
    async fn find_article(&self, fingerprint: &str, title: &str) -> Result<Option<ArticleRecord>> {
        Ok(self.inner.read().await.state.find_article(fingerprint, title))
    }

    async fn create_article(&self, article: NewArticle) -> Result<ArticleRecord> {
        let mut inner = self.inner.write().await;
        let record = inner.state.prepare_article(article)?;
        self.append(&mut inner, &[LogEntry::Article(record.clone())])
            .await?;
        inner.state.insert_article(record.clone());
        Ok(record)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.inner.read().await.state.categories.clone())
    }

    async fn associate_categories(&self, article_id: i64, category_ids: &[i64]) -> Result<()> {
        let mut inner = self.inner.write().await;
        let links = inner.state.new_links(article_id, category_ids)?;
        let entries: Vec<LogEntry> = links
            .iter()
            .map(|&(article_id, category_id)| LogEntry::Link {
                article_id,
                category_id,
            })
            .collect();
        self.append(&mut inner, &entries).await?;
        inner.state.associations.extend(links);
        Ok(())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self.inner.read().await.state.category_by_slug(slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DEFAULT_TAXONOMY;
    use chrono::Utc;

    fn article(external_id: &str, title: &str) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            content: "içerik".to_string(),
            description: "özet".to_string(),
            image_url: Some("https://cdn.example.com/a.jpg".to_string()),
            source_url: "https://example.com/a".to_string(),
            source_name: "Sözcü".to_string(),
            author: "Sözcü".to_string(),
            category_slug: "agenda".to_string(),
            published_at: Utc::now(),
            external_id: external_id.to_string(),
        }
    }

    fn line_count(path: &Path) -> usize {
        std::fs::read_to_string(path).unwrap().lines().count()
    }

    #[tokio::test]
    async fn test_new_store_is_seeded_and_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.jsonl");
        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(line_count(&path), DEFAULT_TAXONOMY.len());
        assert_eq!(store.list_categories().await.unwrap().len(), DEFAULT_TAXONOMY.len());
        assert_eq!(store.article_count().await, 0);
    }

    #[tokio::test]
    async fn test_each_write_appends_only_its_own_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.jsonl");
        let store = JsonFileStore::open(&path).await.unwrap();
        let seeded = line_count(&path);

        let a = store.create_article(article("fp1", "Gündem başlığı")).await.unwrap();
        assert_eq!(line_count(&path), seeded + 1);

        store.associate_categories(a.id, &[2, 3, 3]).await.unwrap();
        assert_eq!(line_count(&path), seeded + 3);

        // already linked: nothing to write
        store.associate_categories(a.id, &[2]).await.unwrap();
        assert_eq!(line_count(&path), seeded + 3);

        let text = std::fs::read_to_string(&path).unwrap();
        let last: LogEntry = serde_json::from_str(text.lines().last().unwrap()).unwrap();
        assert_eq!(
            last,
            LogEntry::Link {
                article_id: a.id,
                category_id: 3
            }
        );
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.jsonl");

        let store = JsonFileStore::open(&path).await.unwrap();
        let a = store.create_article(article("fp1", "Gündem başlığı")).await.unwrap();
        store.associate_categories(a.id, &[2]).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.article_count().await, 1);
        let found = reopened.find_article("fp1", "").await.unwrap().unwrap();
        assert_eq!(found.title, "Gündem başlığı");
        assert_eq!(reopened.inner.read().await.state.categories_of(a.id), vec![2]);

        let b = reopened.create_article(article("fp2", "İkinci")).await.unwrap();
        assert_eq!(b.id, 2);
        assert!(!dir.path().join("news.jsonl.tmp").exists());
    }

    #[tokio::test]
    async fn test_duplicate_external_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.jsonl");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.create_article(article("fp1", "A")).await.unwrap();
        let lines = line_count(&path);

        assert!(store.create_article(article("fp1", "B")).await.is_err());
        assert_eq!(store.article_count().await, 1);
        assert_eq!(line_count(&path), lines);
    }

    #[tokio::test]
    async fn test_failed_append_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.jsonl");
        let store = JsonFileStore::open(&path).await.unwrap();
        let a = store.create_article(article("fp1", "A")).await.unwrap();

        // a directory at the log path makes every append fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = store.create_article(article("fp2", "B")).await.unwrap_err();
        assert!(matches!(err, IngestError::Persistence(_)));
        assert_eq!(store.article_count().await, 1);
        assert!(store.find_article("fp2", "B").await.unwrap().is_none());

        assert!(store.associate_categories(a.id, &[4]).await.is_err());
        assert!(store.inner.read().await.state.categories_of(a.id).is_empty());
    }

    #[tokio::test]
    async fn test_partial_last_line_is_dropped_and_compacted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.jsonl");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.create_article(article("fp1", "A")).await.unwrap();
        drop(store);

        let mut text = std::fs::read_to_string(&path).unwrap();
        let intact = text.lines().count();
        text.push_str(r#"{"op":"article","id":2,"ti"#);
        std::fs::write(&path, text).unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.article_count().await, 1);
        assert_eq!(line_count(&path), intact);

        let b = reopened.create_article(article("fp2", "B")).await.unwrap();
        assert_eq!(b.id, 2);
        drop(reopened);
        assert_eq!(JsonFileStore::open(&path).await.unwrap().article_count().await, 2);
    }

    #[tokio::test]
    async fn test_repeated_links_are_compacted_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.jsonl");
        let store = JsonFileStore::open(&path).await.unwrap();
        let a = store.create_article(article("fp1", "A")).await.unwrap();
        store.associate_categories(a.id, &[2]).await.unwrap();
        drop(store);

        let mut text = std::fs::read_to_string(&path).unwrap();
        let intact = text.lines().count();
        let link = text.lines().last().unwrap().to_string();
        text.push_str(&link);
        text.push('\n');
        std::fs::write(&path, text).unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.inner.read().await.state.categories_of(a.id), vec![2]);
        assert_eq!(line_count(&path), intact);
    }

    #[tokio::test]
    async fn test_corrupt_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.jsonl");
        std::fs::write(&path, b"{ not json\n{\"op\":\"link\",\"article_id\":1,\"category_id\":1}\n").unwrap();
        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, IngestError::Serialization(_)));
    }
}

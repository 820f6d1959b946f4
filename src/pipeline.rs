//! One ingestion pass over every registered source.
//!
//! Sources and items are processed strictly one after another. Failures stay
//! where they happen: a bad feed skips its source, a bad item skips itself,
//! and a page that cannot be fetched or parsed only costs the article its full
//! text. The pass always returns its counters.

use crate::category::{self, Resolution};
use crate::config::{PolitenessSettings, Settings};
use crate::dedup;
use crate::error::Result;
use crate::extract::ContentExtractor;
use crate::feed::FeedFetcher;
use crate::http::Fetch;
use crate::models::{CandidateItem, ExtractionResult, FeedSource, NewArticle, RunStats};
use crate::store::PersistenceGateway;
use crate::utils::{html_to_text, truncate_chars};
use chrono::Utc;
use rand::{Rng, rng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Stored descriptions are cut to this many characters.
pub const DESCRIPTION_MAX_CHARS: usize = 300;

/// Pauses that keep a pass from hammering the outlets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Politeness {
    pub item_delay: Duration,
    pub item_jitter: Duration,
    pub source_delay: Duration,
}

impl Politeness {
    pub fn from_settings(settings: &PolitenessSettings) -> Self {
        Self {
            item_delay: Duration::from_millis(settings.item_delay_ms),
            item_jitter: Duration::from_millis(settings.item_jitter_ms),
            source_delay: Duration::from_millis(settings.source_delay_ms),
        }
    }

    pub fn none() -> Self {
        Self {
            item_delay: Duration::ZERO,
            item_jitter: Duration::ZERO,
            source_delay: Duration::ZERO,
        }
    }

    /// `item_delay` shifted by a uniform offset in `[-item_jitter, +item_jitter]`.
    pub fn item_pause(&self) -> Duration {
        let jitter = self.item_jitter.as_millis() as i64;
        if jitter == 0 {
            return self.item_delay;
        }
        let offset = rng().random_range(-jitter..=jitter);
        let millis = (self.item_delay.as_millis() as i64 + offset).max(0);
        Duration::from_millis(millis as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    NoLink,
    NoTitle,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Saved { extracted: bool },
    Skipped(SkipReason),
}

pub struct Ingestor {
    sources: Vec<FeedSource>,
    gateway: Arc<dyn PersistenceGateway>,
    feeds: FeedFetcher,
    extractor: ContentExtractor,
    default_category: String,
    items_per_source: usize,
    politeness: Politeness,
}

impl Ingestor {
    pub fn new(
        settings: &Settings,
        sources: Vec<FeedSource>,
        http: Arc<dyn Fetch>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            sources,
            gateway,
            feeds: FeedFetcher::new(http.clone(), settings.http.feed_timeout()),
            extractor: ContentExtractor::new(http, settings.http.page_timeout()),
            default_category: settings.default_category.clone(),
            items_per_source: settings.items_per_source,
            politeness: Politeness::from_settings(&settings.politeness),
        }
    }

    pub fn with_politeness(mut self, politeness: Politeness) -> Self {
        self.politeness = politeness;
        self
    }

    /// Poll every source once and store what is new.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn run_ingestion_pass(&self) -> RunStats {
        let t0 = Instant::now();
        let mut stats = RunStats::default();

        for (idx, source) in self.sources.iter().enumerate() {
            if idx > 0 && !self.politeness.source_delay.is_zero() {
                sleep(self.politeness.source_delay).await;
            }
            self.ingest_source(source, &mut stats).await;
        }

        info!(
            saved = stats.saved,
            skipped = stats.skipped,
            errored = stats.errored,
            extraction_misses = stats.extraction_misses,
            sources_failed = stats.sources_failed,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Ingestion pass finished"
        );
        stats
    }

    #[instrument(level = "info", skip_all, fields(source = source.source_name))]
    async fn ingest_source(&self, source: &FeedSource, stats: &mut RunStats) {
        let items = match self.feeds.fetch(source).await {
            Ok(items) => items,
            Err(e) => {
                warn!(url = source.feed_url, error = %e, "Feed unavailable; skipping source");
                stats.sources_failed += 1;
                stats.errored += 1;
                return;
            }
        };

        let before = *stats;
        for item in items.take(self.items_per_source) {
            let title = item.trimmed_title().to_string();
            let mut page_fetched = false;

            match self.process_item(source, item, &mut page_fetched).await {
                Ok(ItemOutcome::Saved { extracted }) => {
                    stats.saved += 1;
                    if !extracted {
                        stats.extraction_misses += 1;
                    }
                }
                Ok(ItemOutcome::Skipped(reason)) => {
                    debug!(?reason, %title, "Skipped item");
                    stats.skipped += 1;
                }
                Err(e) => {
                    error!(%title, error = %e, "Item failed");
                    stats.errored += 1;
                }
            }

            if page_fetched {
                let pause = self.politeness.item_pause();
                if !pause.is_zero() {
                    sleep(pause).await;
                }
            }
        }

        info!(
            saved = stats.saved - before.saved,
            skipped = stats.skipped - before.skipped,
            errored = stats.errored - before.errored,
            "Source done"
        );
    }

    async fn process_item(
        &self,
        source: &FeedSource,
        item: CandidateItem,
        page_fetched: &mut bool,
    ) -> Result<ItemOutcome> {
        let Some(link) = item.link.clone() else {
            warn!(title = item.trimmed_title(), "Item has no usable link");
            return Ok(ItemOutcome::Skipped(SkipReason::NoLink));
        };
        let title = item.trimmed_title().to_string();
        if title.is_empty() {
            return Ok(ItemOutcome::Skipped(SkipReason::NoTitle));
        }

        let fingerprint = dedup::fingerprint(&item, source.source_name);
        if dedup::find_existing(self.gateway.as_ref(), &fingerprint, &item)
            .await?
            .is_some()
        {
            return Ok(ItemOutcome::Skipped(SkipReason::Duplicate));
        }

        let summary = html_to_text(item.raw_body());
        *page_fetched = true;
        let extracted = self.extractor.extract(&link, source.source_name).await;
        let content = ExtractionResult::fold(extracted, &summary, &title);

        let resolution = self.resolve_categories(source.category_slug, &link).await;

        let record = self
            .gateway
            .create_article(NewArticle {
                title: title.clone(),
                content: content.text,
                description: truncate_chars(&summary, DESCRIPTION_MAX_CHARS),
                image_url: item.media_url,
                source_url: link,
                source_name: source.source_name.to_string(),
                author: item
                    .author
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| source.source_name.to_string()),
                category_slug: source.category_slug.to_string(),
                published_at: item.published_at.unwrap_or_else(Utc::now),
                external_id: fingerprint,
            })
            .await?;

        if resolution.ids.is_empty() {
            warn!(id = record.id, "Stored without categories");
        } else {
            self.gateway
                .associate_categories(record.id, &resolution.ids)
                .await?;
        }

        info!(
            id = record.id,
            %title,
            extracted = content.succeeded,
            stage = ?resolution.stage,
            categories = ?resolution.ids,
            "Saved article"
        );
        Ok(ItemOutcome::Saved {
            extracted: content.succeeded,
        })
    }

    async fn resolve_categories(&self, slug: &str, url: &str) -> Resolution {
        match self.gateway.list_categories().await {
            Ok(taxonomy) => category::resolve(slug, Some(url), &taxonomy, &self.default_category),
            Err(e) => {
                warn!(error = %e, "Taxonomy unavailable; using default category");
                match self.gateway.find_category_by_slug(&self.default_category).await {
                    Ok(default) => category::degraded(default.as_ref()),
                    Err(e) => {
                        error!(error = %e, "Default category lookup failed");
                        category::degraded(None)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::http::FetchedPage;
    use crate::models::{ArticleRecord, Category};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Reply {
        Body(&'static str, String),
        Timeout,
        Status(u16),
    }

    #[derive(Default)]
    struct ScriptedFetch {
        replies: HashMap<String, Reply>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetch {
        fn with(mut self, url: &str, reply: Reply) -> Self {
            self.replies.insert(url.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetch {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<FetchedPage> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.replies.get(url).cloned() {
                Some(Reply::Body(ctype, body)) => Ok(FetchedPage {
                    final_url: url.to_string(),
                    status: 200,
                    content_type: Some(ctype.to_string()),
                    bytes: body.into_bytes(),
                }),
                Some(Reply::Timeout) => Err(IngestError::Timeout {
                    url: url.to_string(),
                }),
                Some(Reply::Status(code)) => Err(IngestError::Fetch {
                    url: url.to_string(),
                    reason: format!("HTTP status {code}"),
                }),
                None => Err(IngestError::Fetch {
                    url: url.to_string(),
                    reason: "HTTP status 404 Not Found".to_string(),
                }),
            }
        }
    }

    /// Store whose taxonomy lookups can be made to fail.
    struct FlakyTaxonomy {
        inner: MemoryStore,
        fail_default_lookup: bool,
    }

    #[async_trait]
    impl PersistenceGateway for FlakyTaxonomy {
        async fn find_article(&self, fingerprint: &str, title: &str) -> Result<Option<ArticleRecord>> {
            self.inner.find_article(fingerprint, title).await
        }

        async fn create_article(&self, article: NewArticle) -> Result<ArticleRecord> {
            self.inner.create_article(article).await
        }

        async fn list_categories(&self) -> Result<Vec<Category>> {
            Err(IngestError::CategoryResolution("taxonomy table locked".to_string()))
        }

        async fn associate_categories(&self, article_id: i64, category_ids: &[i64]) -> Result<()> {
            self.inner.associate_categories(article_id, category_ids).await
        }

        async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
            if self.fail_default_lookup {
                return Err(IngestError::Persistence("connection reset".to_string()));
            }
            self.inner.find_category_by_slug(slug).await
        }
    }

    const FEED_URL: &str = "https://www.ntv.com.tr/teknoloji.rss";

    const SOURCE: FeedSource = FeedSource {
        feed_url: FEED_URL,
        category_slug: "teknoloji",
        source_name: "NTV",
    };

    fn rss(items: &[(&str, Option<&str>, &str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(guid, link, title, desc)| {
                let link = link.map(|l| format!("<link>{l}</link>")).unwrap_or_default();
                format!(
                    "<item><guid>{guid}</guid>{link}<title>{title}</title><description>{desc}</description></item>"
                )
            })
            .collect();
        format!("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>NTV</title>{body}</channel></rss>")
    }

    fn article_page(text: &str) -> Reply {
        Reply::Body(
            "text/html; charset=utf-8",
            format!("<html><body><div class=\"article-body\"><p>{text}</p></div></body></html>"),
        )
    }

    fn long_text() -> String {
        "Yeni nesil işlemciler tanıtıldı ve performans testleri yayımlandı. ".repeat(6)
    }

    fn ingestor(fetch: Arc<ScriptedFetch>, gateway: Arc<dyn PersistenceGateway>) -> Ingestor {
        Ingestor::new(&Settings::default(), vec![SOURCE], fetch, gateway)
            .with_politeness(Politeness::none())
    }

    #[tokio::test]
    async fn test_dedup_scenario_saves_new_and_skips_stored() {
        let store = MemoryStore::seeded();
        let feed = rss(&[
            ("G1", Some("https://www.ntv.com.tr/a1"), "Eski haber", "özet 1"),
            ("G2", Some("https://www.ntv.com.tr/a2"), "Yeni haber", "özet 2"),
        ]);
        let fetch = Arc::new(
            ScriptedFetch::default()
                .with(FEED_URL, Reply::Body("application/rss+xml", feed))
                .with("https://www.ntv.com.tr/a1", article_page(&long_text()))
                .with("https://www.ntv.com.tr/a2", article_page(&long_text())),
        );

        // pre-store G1 under a title the feed no longer uses
        let g1 = CandidateItem {
            guid: Some("G1".to_string()),
            ..Default::default()
        };
        store
            .create_article(NewArticle {
                title: "Tamamen farklı".to_string(),
                content: "c".to_string(),
                description: "d".to_string(),
                image_url: None,
                source_url: "https://www.ntv.com.tr/a1".to_string(),
                source_name: "NTV".to_string(),
                author: "NTV".to_string(),
                category_slug: "teknoloji".to_string(),
                published_at: Utc::now(),
                external_id: dedup::fingerprint(&g1, "NTV"),
            })
            .await
            .unwrap();

        let stats = ingestor(fetch.clone(), Arc::new(store.clone()))
            .run_ingestion_pass()
            .await;
        assert_eq!(stats.saved, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.errored, 0);

        // the duplicate never caused a page fetch
        assert!(!fetch.calls().contains(&"https://www.ntv.com.tr/a1".to_string()));

        let state = store.snapshot().await;
        let saved = state.articles.iter().find(|a| a.title == "Yeni haber").unwrap();
        assert!(saved.content.starts_with("Yeni nesil işlemciler"));
        assert_eq!(saved.author, "NTV");
        assert_eq!(saved.description, "özet 2");
        let technology = state.category_by_slug("technology").unwrap();
        assert_eq!(state.categories_of(saved.id), vec![technology.id]);
    }

    #[tokio::test]
    async fn test_page_timeout_keeps_description() {
        let store = MemoryStore::seeded();
        let feed = rss(&[(
            "T1",
            Some("https://www.ntv.com.tr/slow"),
            "Yavaş sayfa",
            "&lt;p&gt;Feed özeti burada&lt;/p&gt;",
        )]);
        let fetch = Arc::new(
            ScriptedFetch::default()
                .with(FEED_URL, Reply::Body("application/rss+xml", feed))
                .with("https://www.ntv.com.tr/slow", Reply::Timeout),
        );

        let stats = ingestor(fetch, Arc::new(store.clone())).run_ingestion_pass().await;
        assert_eq!(stats.saved, 1);
        assert_eq!(stats.errored, 0);
        assert_eq!(stats.extraction_misses, 1);

        let state = store.snapshot().await;
        assert_eq!(state.articles[0].content, "Feed özeti burada");
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let store = MemoryStore::seeded();
        let feed = rss(&[
            ("I1", Some("https://www.ntv.com.tr/i1"), "Birinci", "özet"),
            ("I2", Some("https://www.ntv.com.tr/i2"), "İkinci", "özet"),
        ]);
        let fetch = Arc::new(
            ScriptedFetch::default()
                .with(FEED_URL, Reply::Body("application/rss+xml", feed))
                .with("https://www.ntv.com.tr/i1", article_page(&long_text())),
        );
        let ingestor = ingestor(fetch, Arc::new(store.clone()));

        let first = ingestor.run_ingestion_pass().await;
        assert_eq!(first.saved, 2);
        // i2 has no page: stored from its description
        assert_eq!(first.extraction_misses, 1);

        let second = ingestor.run_ingestion_pass().await;
        assert_eq!(second.saved, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.snapshot().await.articles.len(), 2);
    }

    #[tokio::test]
    async fn test_retitled_items_are_still_skipped_by_guid() {
        let store = MemoryStore::seeded();
        let first_feed = rss(&[
            ("I1", Some("https://www.ntv.com.tr/i1"), "Birinci", "özet"),
            ("I2", Some("https://www.ntv.com.tr/i2"), "İkinci", "özet"),
        ]);
        let first = ingestor(
            Arc::new(
                ScriptedFetch::default()
                    .with(FEED_URL, Reply::Body("application/rss+xml", first_feed)),
            ),
            Arc::new(store.clone()),
        )
        .run_ingestion_pass()
        .await;
        assert_eq!(first.saved, 2);

        // same guids, edited headlines
        let second_feed = rss(&[
            ("I1", Some("https://www.ntv.com.tr/i1"), "Birinci (güncellendi)", "özet"),
            ("I2", Some("https://www.ntv.com.tr/i2"), "İkinci haberde son durum", "özet"),
        ]);
        let fetch = Arc::new(
            ScriptedFetch::default()
                .with(FEED_URL, Reply::Body("application/rss+xml", second_feed)),
        );
        let second = ingestor(fetch.clone(), Arc::new(store.clone()))
            .run_ingestion_pass()
            .await;
        assert_eq!(second.saved, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(fetch.calls(), vec![FEED_URL.to_string()]);
        assert_eq!(store.snapshot().await.articles.len(), 2);
    }

    #[tokio::test]
    async fn test_items_without_link_or_title_are_skipped() {
        let store = MemoryStore::seeded();
        let feed = rss(&[
            ("N1", None, "Bağlantısız", "özet"),
            ("N2", Some("javascript:void(0)"), "Geçersiz bağlantı", "özet"),
            ("N3", Some("https://www.ntv.com.tr/n3"), "", "özet"),
        ]);
        let fetch = Arc::new(
            ScriptedFetch::default().with(FEED_URL, Reply::Body("application/rss+xml", feed)),
        );

        let stats = ingestor(fetch.clone(), Arc::new(store.clone()))
            .run_ingestion_pass()
            .await;
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.saved, 0);
        assert_eq!(fetch.calls(), vec![FEED_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_content_falls_back_to_title() {
        let store = MemoryStore::seeded();
        let feed = rss(&[("E1", Some("https://www.ntv.com.tr/e1"), "Sadece başlık", "")]);
        let fetch = Arc::new(
            ScriptedFetch::default()
                .with(FEED_URL, Reply::Body("application/rss+xml", feed))
                .with("https://www.ntv.com.tr/e1", Reply::Status(500)),
        );

        let stats = ingestor(fetch, Arc::new(store.clone())).run_ingestion_pass().await;
        assert_eq!(stats.saved, 1);
        assert_eq!(store.snapshot().await.articles[0].content, "Sadece başlık");
    }

    #[tokio::test]
    async fn test_feed_failure_skips_source_and_continues() {
        let store = MemoryStore::seeded();
        let other = FeedSource {
            feed_url: "https://www.sabah.com.tr/rss/ekonomi.xml",
            category_slug: "economy",
            source_name: "Sabah",
        };
        let feed = rss(&[("S1", Some("https://www.sabah.com.tr/s1"), "Faiz kararı", "özet")]);
        let fetch = Arc::new(
            ScriptedFetch::default()
                .with(FEED_URL, Reply::Timeout)
                .with(other.feed_url, Reply::Body("application/rss+xml", feed)),
        );
        let ingestor = Ingestor::new(
            &Settings::default(),
            vec![SOURCE, other],
            fetch,
            Arc::new(store.clone()),
        )
        .with_politeness(Politeness::none());

        let stats = ingestor.run_ingestion_pass().await;
        assert_eq!(stats.sources_failed, 1);
        assert_eq!(stats.errored, 1);
        assert_eq!(stats.saved, 1);
    }

    #[tokio::test]
    async fn test_malformed_feed_counts_as_source_failure() {
        let fetch = Arc::new(ScriptedFetch::default().with(
            FEED_URL,
            Reply::Body("text/html", "<html><body>bakımda</body></html>".to_string()),
        ));
        let stats = ingestor(fetch, Arc::new(MemoryStore::seeded()))
            .run_ingestion_pass()
            .await;
        assert_eq!(stats.sources_failed, 1);
        assert_eq!(stats.saved, 0);
    }

    #[tokio::test]
    async fn test_items_per_source_cap() {
        let store = MemoryStore::seeded();
        let items: Vec<(String, String, String)> = (0..4)
            .map(|i| (format!("C{i}"), format!("https://www.ntv.com.tr/c{i}"), format!("Haber {i}")))
            .collect();
        let refs: Vec<(&str, Option<&str>, &str, &str)> = items
            .iter()
            .map(|(g, l, t)| (g.as_str(), Some(l.as_str()), t.as_str(), "özet"))
            .collect();
        let fetch = Arc::new(
            ScriptedFetch::default().with(FEED_URL, Reply::Body("application/rss+xml", rss(&refs))),
        );
        let settings = Settings {
            items_per_source: 2,
            ..Default::default()
        };
        let ingestor = Ingestor::new(&settings, vec![SOURCE], fetch, Arc::new(store.clone()))
            .with_politeness(Politeness::none());

        assert_eq!(ingestor.run_ingestion_pass().await.saved, 2);
    }

    #[tokio::test]
    async fn test_taxonomy_failure_degrades_to_default() {
        let inner = MemoryStore::seeded();
        let feed = rss(&[("D1", Some("https://www.ntv.com.tr/d1"), "Kategori yok", "özet")]);
        let fetch = Arc::new(
            ScriptedFetch::default().with(FEED_URL, Reply::Body("application/rss+xml", feed)),
        );
        let gateway = Arc::new(FlakyTaxonomy {
            inner: inner.clone(),
            fail_default_lookup: false,
        });

        let stats = ingestor(fetch, gateway).run_ingestion_pass().await;
        assert_eq!(stats.saved, 1);

        let state = inner.snapshot().await;
        let agenda = state.category_by_slug("agenda").unwrap();
        assert_eq!(state.categories_of(state.articles[0].id), vec![agenda.id]);
    }

    #[tokio::test]
    async fn test_total_taxonomy_failure_stores_without_categories() {
        let inner = MemoryStore::seeded();
        let feed = rss(&[("D2", Some("https://www.ntv.com.tr/d2"), "Yine kategori yok", "özet")]);
        let fetch = Arc::new(
            ScriptedFetch::default().with(FEED_URL, Reply::Body("application/rss+xml", feed)),
        );
        let gateway = Arc::new(FlakyTaxonomy {
            inner: inner.clone(),
            fail_default_lookup: true,
        });

        let stats = ingestor(fetch, gateway).run_ingestion_pass().await;
        assert_eq!(stats.saved, 1);
        assert_eq!(stats.errored, 0);
        assert!(inner.snapshot().await.associations.is_empty());
    }

    #[test]
    fn test_item_pause_stays_within_jitter() {
        let politeness = Politeness {
            item_delay: Duration::from_millis(1000),
            item_jitter: Duration::from_millis(500),
            source_delay: Duration::from_millis(2000),
        };
        for _ in 0..200 {
            let pause = politeness.item_pause();
            assert!(pause >= Duration::from_millis(500) && pause <= Duration::from_millis(1500));
        }
        assert_eq!(Politeness::none().item_pause(), Duration::ZERO);
    }
}

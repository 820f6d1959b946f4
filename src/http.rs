//! Outbound HTTP for feeds and article pages.
//!
//! All network access goes through the [`Fetch`] trait so the pipeline can be
//! driven by scripted responses in tests. [`HttpFetcher`] is the reqwest-backed
//! implementation: browser-like user agent, `Accept-Language`, bounded
//! redirects and a per-request timeout. Bodies are returned as raw bytes and
//! decoded by the caller with [`crate::charset`].

use crate::config::HttpSettings;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedPage {
    pub fn text(&self) -> String {
        crate::charset::decode(&self.bytes, self.content_type.as_deref())
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    /// One GET, no retries. Non-2xx statuses are errors.
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedPage>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let accept_language = HeaderValue::from_str(&settings.accept_language)
            .map_err(|e| IngestError::Config(format!("invalid accept_language: {e}")))?;
        headers.insert(header::ACCEPT_LANGUAGE, accept_language);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/rss+xml,application/atom+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(settings.feed_timeout().max(settings.page_timeout()))
            .pool_idle_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| IngestError::Config(format!("failed to build reqwest client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self), fields(%url))]
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedPage> {
        let t0 = Instant::now();
        let res = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| IngestError::from_reqwest(url, e))?;

        let status = res.status();
        let final_url = res.url().to_string();
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        debug!(%final_url, %status, ctype = content_type.as_deref().unwrap_or("<none>"), "Response headers");

        if !status.is_success() {
            return Err(IngestError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP status {status}"),
            });
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| IngestError::from_reqwest(url, e))?
            .to_vec();

        info!(
            %final_url,
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            content_type,
            bytes,
        })
    }
}

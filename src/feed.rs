//! Feed fetching and parsing (RSS 2.0 and Atom).
//!
//! A feed is fetched once, decoded with its declared charset, and parsed with
//! quick-xml into [`CandidateItem`]s. Any failure empties the whole source:
//! the caller logs it once and moves on. There are no retries.

use crate::error::{IngestError, Result};
use crate::http::Fetch;
use crate::models::{CandidateItem, FeedSource};
use crate::utils::{first_img_src, html_to_text};
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, escape};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Items of one fetched feed, consumed once in document order.
#[derive(Debug)]
pub struct FeedItems {
    inner: std::vec::IntoIter<CandidateItem>,
}

impl FeedItems {
    pub fn new(items: Vec<CandidateItem>) -> Self {
        Self {
            inner: items.into_iter(),
        }
    }
}

impl Iterator for FeedItems {
    type Item = CandidateItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct FeedFetcher {
    http: Arc<dyn Fetch>,
    timeout: Duration,
}

impl FeedFetcher {
    pub fn new(http: Arc<dyn Fetch>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Fetch and parse one source's feed.
    #[instrument(level = "info", skip_all, fields(source = source.source_name, url = source.feed_url))]
    pub async fn fetch(&self, source: &FeedSource) -> Result<FeedItems> {
        let page = self.http.get(source.feed_url, self.timeout).await?;
        let text = page.text();
        let items = parse_feed(&text, &page.final_url)?;
        info!(count = items.len(), "Parsed feed");
        Ok(FeedItems::new(items))
    }
}

#[derive(Default)]
struct ItemBuilder {
    item: CandidateItem,
    media: Option<String>,
    enclosure: Option<String>,
    raw_link: Option<String>,
}

impl ItemBuilder {
    fn finish(self, base: Option<&Url>) -> CandidateItem {
        let mut item = self.item;
        item.link = self.raw_link.as_deref().and_then(|l| resolve_link(base, l));
        item.media_url = self
            .media
            .or(self.enclosure)
            .or_else(|| first_img_src(item.raw_body()));
        // titles are often double-escaped inside CDATA
        item.title = html_to_text(&item.title);
        item.guid = item.guid.map(|g| g.trim().to_string()).filter(|g| !g.is_empty());
        item.author = item.author.map(|a| a.trim().to_string()).filter(|a| !a.is_empty());
        item
    }

    fn apply_attributes(&mut self, name: &str, e: &BytesStart<'_>) {
        match name {
            // Atom: <link rel="alternate" href="…"/>
            "link" => {
                let rel = attr(e, "rel");
                if matches!(rel.as_deref(), None | Some("alternate")) {
                    if let Some(href) = attr(e, "href") {
                        self.raw_link.get_or_insert(href);
                    }
                }
            }
            "media:content" | "media:thumbnail" => {
                if let Some(u) = attr(e, "url") {
                    self.media.get_or_insert(u);
                }
            }
            "enclosure" => {
                let is_image = attr(e, "type")
                    .map(|t| t.starts_with("image/"))
                    .unwrap_or(true);
                if is_image {
                    if let Some(u) = attr(e, "url") {
                        self.enclosure.get_or_insert(u);
                    }
                }
            }
            _ => {}
        }
    }

    fn apply_text(&mut self, name: &str, parent: Option<&str>, text: String) {
        let item = &mut self.item;
        match name {
            "title" if item.title.is_empty() => item.title = text,
            "link" if !text.trim().is_empty() => {
                self.raw_link.get_or_insert(text);
            }
            "guid" | "id" if item.guid.is_none() => item.guid = Some(text),
            "pubdate" | "published" | "dc:date" | "updated" if item.published_at.is_none() => {
                item.published_at = parse_date(&text);
            }
            "description" | "summary" if item.raw_description.is_empty() => {
                item.raw_description = text
            }
            "content:encoded" | "content" if item.content_encoded.is_empty() => {
                item.content_encoded = text
            }
            "dc:creator" | "author" if item.author.is_none() && !text.trim().is_empty() => {
                item.author = Some(text)
            }
            "name" if parent == Some("author") && item.author.is_none() => item.author = Some(text),
            _ => {}
        }
    }
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(key.as_bytes()))
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value).into_owned();
            match escape::unescape(&raw) {
                Ok(cow) => cow.into_owned(),
                Err(_) => raw,
            }
        })
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Elements whose nested markup is body content rather than item structure.
const BODY_ELEMENTS: &[&str] = &["description", "summary", "content", "content:encoded"];

/// Re-emit a nested xhtml element as an html tag, keeping only `src`/`href`.
fn push_open_tag(text: &mut String, e: &BytesStart<'_>, self_closing: bool) {
    let local = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
    text.push('<');
    text.push_str(&local);
    for key in ["src", "href"] {
        if let Some(value) = attr(e, key) {
            text.push_str(&format!(" {key}=\"{}\"", value.replace('"', "&quot;")));
        }
    }
    if self_closing && local != "img" && local != "br" {
        text.push_str("></");
        text.push_str(&local);
    }
    text.push('>');
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

/// Parse RSS `<item>` and Atom `<entry>` elements out of a decoded feed document.
pub fn parse_feed(xml: &str, feed_url: &str) -> Result<Vec<CandidateItem>> {
    let base = Url::parse(feed_url).ok();
    let mut reader = Reader::from_str(xml);

    let mut items = Vec::<CandidateItem>::new();
    let mut current: Option<ItemBuilder> = None;
    let mut stack = Vec::<String>::new();
    let mut text = String::new();
    let mut saw_root = false;
    // open body element (description/summary/content) and how deep we are inside it
    let mut body: Option<usize> = None;

    let malformed = |reason: String| IngestError::Feed {
        url: feed_url.to_string(),
        reason,
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);
                if matches!(name.as_str(), "rss" | "feed" | "rdf:rdf" | "channel") {
                    saw_root = true;
                }
                if let Some(depth) = body.as_mut() {
                    // xhtml markup inside a body is kept as html
                    *depth += 1;
                    push_open_tag(&mut text, &e, false);
                } else if name == "item" || name == "entry" {
                    current = Some(ItemBuilder::default());
                    stack.clear();
                } else if let Some(builder) = current.as_mut() {
                    builder.apply_attributes(&name, &e);
                    if stack.is_empty() && BODY_ELEMENTS.contains(&name.as_str()) {
                        body = Some(0);
                    }
                    stack.push(name);
                    text.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                if body.is_some() {
                    push_open_tag(&mut text, &e, true);
                } else if let Some(builder) = current.as_mut() {
                    builder.apply_attributes(&element_name(&e), &e);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if let Some(depth) = body.as_mut() {
                    if *depth > 0 {
                        *depth -= 1;
                        text.push_str("</");
                        text.push_str(&String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase());
                        text.push('>');
                        continue;
                    }
                    body = None;
                }
                if name == "item" || name == "entry" {
                    if let Some(builder) = current.take() {
                        items.push(builder.finish(base.as_ref()));
                    }
                } else if let Some(builder) = current.as_mut() {
                    stack.pop();
                    let parent = stack.last().map(String::as_str);
                    builder.apply_text(&name, parent, text.trim().to_string());
                    text.clear();
                }
            }
            Ok(Event::Text(t)) => {
                if current.is_some() {
                    let raw = String::from_utf8_lossy(t.as_ref());
                    let unescaped: Cow<'_, str> = match escape::unescape(&raw) {
                        Ok(cow) => cow,
                        Err(_) => raw.clone(),
                    };
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(c)) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if current.is_some() {
                    push_entity(&mut text, &r);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, offset = reader.buffer_position(), "XML parse error");
                return Err(malformed(e.to_string()));
            }
        }
    }

    if !saw_root {
        return Err(malformed("no <rss>, <feed> or <channel> element".to_string()));
    }
    debug!(count = items.len(), "Feed parse summary");
    Ok(items)
}

fn push_entity(text: &mut String, r: &quick_xml::events::BytesRef<'_>) {
    if r.is_char_ref() {
        if let Ok(Some(ch)) = r.resolve_char_ref() {
            text.push(ch);
            return;
        }
    }
    let name = String::from_utf8_lossy(r.as_ref()).into_owned();
    match escape::resolve_predefined_entity(&name) {
        Some(s) => text.push_str(s),
        // HTML entities in unescaped feeds; html_to_text decodes them later
        None => {
            text.push('&');
            text.push_str(&name);
            text.push(';');
        }
    }
}

/// Resolve an item link against the feed URL; only http(s) links survive.
pub fn resolve_link(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = match Url::parse(raw) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(raw).ok()?,
        Err(_) => return None,
    };
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url.to_string()),
        _ => None,
    }
}

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    debug!(raw, "Unparseable feed date");
    None
}

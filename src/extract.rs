//! Full-text extraction from article pages.
//!
//! Extraction is a chain of stages tried in order, each a pure function over
//! the parsed page. The first stage whose text is longer than
//! [`MIN_TEXT_LEN`] characters wins:
//!
//! 1. **Source strategies**: the outlet's own entry in [`SOURCE_STRATEGIES`]
//! 2. **Generic selectors**: common article-container patterns
//! 3. **Paragraphs**: the first 15 `<p>` elements, short ones dropped
//!
//! When nothing qualifies the extractor returns `None` and the caller keeps
//! the feed description. Fetch failures and timeouts end up the same way:
//! they are logged, never raised.

use crate::http::Fetch;
use crate::utils::{collapse_whitespace, truncate_for_log};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Text must be strictly longer than this (in characters) to count.
pub const MIN_TEXT_LEN: usize = 150;

const PARAGRAPH_LIMIT: usize = 15;
const PARAGRAPH_MIN_LEN: usize = 30;

/// One way of pulling body text out of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Try each selector in turn; take the first matching element, minus noise.
    Selectors(&'static [&'static str]),
    /// Join every matching element whose text is longer than `min_len`.
    Paragraphs {
        selector: &'static str,
        min_len: usize,
    },
}

/// Known outlets and the strategies that find their article bodies.
pub const SOURCE_STRATEGIES: &[(&str, &[Strategy])] = &[
    (
        "Habertürk",
        &[
            Strategy::Selectors(&[".news-detail-content", ".news-content", ".haber-detay .content"]),
            Strategy::Paragraphs {
                selector: ".news-detail-content p, .content p, article p",
                min_len: 20,
            },
        ],
    ),
    (
        "CNN Türk",
        &[
            Strategy::Selectors(&[
                ".detail-news-content",
                ".content-text",
                ".news-detail__body",
                ".detail-content",
            ]),
            Strategy::Paragraphs {
                selector: ".detail-news-content p, .content-text p, .news-detail__body p",
                min_len: 20,
            },
        ],
    ),
    (
        "Sözcü",
        &[Strategy::Selectors(&[".content-text", ".news-detail__content", ".article-content"])],
    ),
    (
        "Hürriyet",
        &[Strategy::Selectors(&[".news-content", ".news-detail-text", ".article-content"])],
    ),
    (
        "Milliyet",
        &[Strategy::Selectors(&[".article__content", ".article-body", ".news-content"])],
    ),
    (
        "NTV",
        &[Strategy::Selectors(&[
            ".category-detail-content-inner",
            ".news-detail-content",
            ".article-body",
        ])],
    ),
    (
        "Sabah",
        &[Strategy::Selectors(&[".NewsDetailText", ".article-content", ".content"])],
    ),
    (
        "Cumhuriyet",
        &[Strategy::Selectors(&[".news-content", ".detail-content", ".article-content"])],
    ),
    (
        "TRT Haber",
        &[Strategy::Selectors(&[".detail-content", ".article-body", ".news-text"])],
    ),
    (
        "Webtekno",
        &[Strategy::Selectors(&[".content", ".post-content", ".article-content"])],
    ),
    (
        "ShiftDelete",
        &[Strategy::Selectors(&[".entry-content", ".post-content", ".article-content"])],
    ),
    (
        "Technopat",
        &[Strategy::Selectors(&[".entry-content", ".post-content", ".article-content"])],
    ),
    (
        "Bloomberg HT",
        &[Strategy::Selectors(&[".news-content", ".article-body", ".content-text"])],
    ),
    (
        "Fanatik",
        &[Strategy::Selectors(&[".news-detail", ".article-content", ".content-text"])],
    ),
    (
        "Sporx",
        &[Strategy::Selectors(&[".news-content", ".detail-content", ".article-content"])],
    ),
];

const GENERIC_SELECTORS: &[&str] = &[
    "article .content",
    ".news-detail",
    ".news-content",
    ".article__content",
    ".content-text",
    ".detail-content",
    ".news-detail-content",
    ".detail-news-content",
    "article p",
    ".entry-content",
    ".post-content",
    ".article-content",
    ".news-text",
    ".detail-text",
    ".article-body",
    "article",
    ".detail",
    ".content",
];

static NOISE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(concat!(
        "script, style, iframe, noscript, ",
        ".social-share, .share, .ads, .ad, .advertisement, .banner, ",
        ".related-news, .related, .related-content"
    ))
    .unwrap()
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "blockquote", "figcaption", "tr", "td",
];

fn long_enough(text: &str) -> bool {
    text.chars().count() > MIN_TEXT_LEN
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if NOISE.matches(&child_el) {
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&child_el.value().name());
            if block {
                out.push(' ');
            }
            collect_text(child_el, out);
            if block {
                out.push(' ');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Visible text of `el` with noise subtrees skipped and whitespace collapsed.
pub fn clean_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    collapse_whitespace(&out)
}

fn first_match_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = document.select(&sel).next()?;
    Some(clean_text(el))
}

fn run_strategy(document: &Html, strategy: &Strategy) -> Option<String> {
    match strategy {
        Strategy::Selectors(selectors) => selectors
            .iter()
            .filter_map(|s| first_match_text(document, s))
            .find(|t| long_enough(t)),
        Strategy::Paragraphs { selector, min_len } => {
            let sel = Selector::parse(selector).ok()?;
            let joined = document
                .select(&sel)
                .map(clean_text)
                .filter(|t| t.chars().count() > *min_len)
                .join(" ");
            long_enough(&joined).then_some(joined)
        }
    }
}

pub fn strategies_for(source: &str) -> Option<&'static [Strategy]> {
    SOURCE_STRATEGIES
        .iter()
        .find(|(name, _)| *name == source)
        .map(|(_, strategies)| *strategies)
}

fn source_specific(document: &Html, source: &str) -> Option<String> {
    strategies_for(source)?
        .iter()
        .find_map(|strategy| run_strategy(document, strategy))
}

fn generic_selectors(document: &Html, _source: &str) -> Option<String> {
    run_strategy(document, &Strategy::Selectors(GENERIC_SELECTORS))
}

fn paragraph_aggregation(document: &Html, _source: &str) -> Option<String> {
    let joined = document
        .select(&PARAGRAPH)
        .take(PARAGRAPH_LIMIT)
        .map(clean_text)
        .filter(|t| t.chars().count() > PARAGRAPH_MIN_LEN)
        .join(" ");
    long_enough(&joined).then_some(joined)
}

type Stage = fn(&Html, &str) -> Option<String>;

const STAGES: &[(&str, Stage)] = &[
    ("source", source_specific),
    ("generic", generic_selectors),
    ("paragraphs", paragraph_aggregation),
];

/// Run the stage chain over an already-decoded page.
pub fn extract_from_html(html: &str, source: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for (stage, run) in STAGES {
        if let Some(text) = run(&document, source) {
            debug!(stage, chars = text.chars().count(), "Extraction stage succeeded");
            return Some(text);
        }
    }
    None
}

pub struct ContentExtractor {
    http: Arc<dyn Fetch>,
    timeout: Duration,
}

impl ContentExtractor {
    pub fn new(http: Arc<dyn Fetch>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Fetch `url` once and extract its body text. `None` is a miss, not an error.
    #[instrument(level = "info", skip_all, fields(%url, %source))]
    pub async fn extract(&self, url: &str, source: &str) -> Option<String> {
        let page = match self.http.get(url, self.timeout).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, timeout = e.is_timeout(), "Article fetch failed; using feed description");
                return None;
            }
        };

        let html = page.text();
        match extract_from_html(&html, source) {
            Some(text) => {
                info!(chars = text.chars().count(), "Extracted article body");
                Some(text)
            }
            None => {
                warn!("No extraction stage reached the length threshold");
                debug!(preview = %truncate_for_log(&html.replace('\n', " "), 600), "HTML preview");
                None
            }
        }
    }
}

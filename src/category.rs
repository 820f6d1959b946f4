//! Maps a feed's category slug onto taxonomy ids.
//!
//! Resolution is an ordered list of pure stages over a freshly loaded
//! taxonomy; the first stage that yields anything wins. When every stage comes
//! up empty the default category (or, failing that, the first one) is used, so
//! a non-empty taxonomy always produces at least one id.

use crate::models::Category;
use itertools::Itertools;
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    Exact,
    Substring,
    UrlToken,
    Alias,
    Fallback,
    /// The taxonomy could not be loaded; only the default slug was looked up.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub ids: Vec<i64>,
    pub stage: ResolutionStage,
}

/// Canonical slug and the spellings feeds use for it.
pub const ALIASES: &[(&str, &[&str])] = &[
    ("breaking-news", &["breaking-news", "agenda", "son-dakika"]),
    ("agenda", &["agenda", "gündem"]),
    ("world", &["world", "dunya", "dünya"]),
    ("politics", &["politics", "siyaset", "politika"]),
    ("economy", &["economy", "ekonomi"]),
    ("business", &["business", "is-dunyasi", "iş-dünyası"]),
    ("technology", &["technology", "teknoloji"]),
    ("science", &["science", "bilim"]),
    ("health", &["health", "sağlık", "saglik"]),
    ("education", &["education", "eğitim", "egitim"]),
    ("sports", &["sports", "spor"]),
    ("football", &["football", "futbol"]),
    ("basketball", &["basketball", "basketbol"]),
    ("entertainment", &["entertainment", "magazin"]),
    ("culture-art", &["culture-art", "kültür-sanat", "kultur-sanat"]),
    ("lifestyle", &["lifestyle", "yaşam", "yasam"]),
    ("travel", &["travel", "seyahat", "gezi"]),
    ("automotive", &["automotive", "otomobil", "araba"]),
    ("real-estate", &["real-estate", "emlak"]),
    ("environment", &["environment", "çevre", "cevre"]),
    ("local", &["local", "yerel"]),
];

const MIN_URL_TOKEN_LEN: usize = 4;

/// Bidirectional substring test of `term` against a category's slug and name.
fn loosely_matches(term: &str, category: &Category) -> bool {
    if term.is_empty() {
        return false;
    }
    let slug = category.slug.to_lowercase();
    let name = category.name.to_lowercase();
    [slug, name]
        .iter()
        .filter(|s| !s.is_empty())
        .any(|s| s.contains(term) || term.contains(s.as_str()))
}

struct Query<'a> {
    slug: String,
    url: Option<&'a str>,
}

type Stage = fn(&Query<'_>, &[Category]) -> Vec<i64>;

fn exact(query: &Query<'_>, taxonomy: &[Category]) -> Vec<i64> {
    taxonomy
        .iter()
        .find(|c| c.slug.to_lowercase() == query.slug)
        .map(|c| vec![c.id])
        .unwrap_or_default()
}

fn substring(query: &Query<'_>, taxonomy: &[Category]) -> Vec<i64> {
    taxonomy
        .iter()
        .filter(|c| loosely_matches(&query.slug, c))
        .map(|c| c.id)
        .collect()
}

/// Percent-decoded, lowercased path segments long enough to mean something.
pub fn url_tokens(url: &str) -> Vec<String> {
    let Ok(parsed) = Url::parse(url) else {
        return Vec::new();
    };
    let Some(segments) = parsed.path_segments() else {
        return Vec::new();
    };
    segments
        .map(|seg| {
            urlencoding::decode(seg)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| seg.to_string())
                .to_lowercase()
        })
        .filter(|seg| seg.chars().count() >= MIN_URL_TOKEN_LEN)
        .collect()
}

fn url_token(query: &Query<'_>, taxonomy: &[Category]) -> Vec<i64> {
    let Some(url) = query.url else {
        return Vec::new();
    };
    url_tokens(url)
        .iter()
        .find_map(|token| taxonomy.iter().find(|c| loosely_matches(token, c)))
        .map(|c| vec![c.id])
        .unwrap_or_default()
}

/// The alias row for `slug`: its own row, else the first row listing it as a spelling.
fn alias_row(slug: &str) -> Option<&'static [&'static str]> {
    ALIASES
        .iter()
        .find(|(canonical, _)| *canonical == slug)
        .or_else(|| ALIASES.iter().find(|(_, spellings)| spellings.contains(&slug)))
        .map(|(_, spellings)| *spellings)
}

fn alias(query: &Query<'_>, taxonomy: &[Category]) -> Vec<i64> {
    let own = [query.slug.as_str()];
    let candidates = alias_row(&query.slug).unwrap_or(&own[..]);

    candidates
        .iter()
        .find_map(|alias| {
            taxonomy
                .iter()
                .find(|c| c.slug.to_lowercase() == *alias || loosely_matches(alias, c))
        })
        .map(|c| vec![c.id])
        .unwrap_or_default()
}

const STAGES: &[(ResolutionStage, Stage)] = &[
    (ResolutionStage::Exact, exact),
    (ResolutionStage::Substring, substring),
    (ResolutionStage::UrlToken, url_token),
    (ResolutionStage::Alias, alias),
];

/// Resolve `slug` (and optionally the article URL) against `taxonomy`.
///
/// The returned ids are unique and in taxonomy order. They are empty only when
/// the taxonomy itself is empty.
pub fn resolve(slug: &str, url: Option<&str>, taxonomy: &[Category], default_slug: &str) -> Resolution {
    let query = Query {
        slug: slug.trim().to_lowercase(),
        url,
    };

    for (stage, run) in STAGES {
        let ids: Vec<i64> = run(&query, taxonomy).into_iter().unique().collect();
        if !ids.is_empty() {
            return Resolution { ids, stage: *stage };
        }
    }

    let ids = taxonomy
        .iter()
        .find(|c| c.slug == default_slug)
        .or_else(|| taxonomy.first())
        .map(|c| vec![c.id])
        .unwrap_or_default();
    Resolution {
        ids,
        stage: ResolutionStage::Fallback,
    }
}

/// What the pipeline uses when the taxonomy could not be loaded.
pub fn degraded(default: Option<&Category>) -> Resolution {
    Resolution {
        ids: default.map(|c| vec![c.id]).unwrap_or_default(),
        stage: ResolutionStage::Degraded,
    }
}

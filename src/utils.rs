use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static IMG_SRC: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

/// Truncate a string for logging purposes
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Keep at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Plain text of an HTML fragment, entities decoded and whitespace collapsed.
pub fn html_to_text(fragment: &str) -> String {
    if fragment.trim().is_empty() {
        return String::new();
    }
    let doc = Html::parse_fragment(fragment);
    let text = doc.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// `src` of the first `<img>` in an HTML fragment.
pub fn first_img_src(fragment: &str) -> Option<String> {
    let doc = Html::parse_fragment(fragment);
    doc.select(&IMG_SRC)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

/// Ensure the directory holding `file_path` exists and is writable.
#[instrument(level = "info", skip_all, fields(path = %file_path))]
pub async fn ensure_writable_parent(file_path: &str) -> Result<(), Box<dyn Error>> {
    let dir = match Path::new(file_path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;
    // Try a small sync write using std fs (simpler error surface)
    let check_path = dir.join("..__write_check__");
    stdfs::File::create(&check_path)?;
    let _ = stdfs::remove_file(&check_path);
    info!(dir = %dir.display(), "Store directory is writable");
    Ok(())
}

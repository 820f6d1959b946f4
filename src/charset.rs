//! Byte-to-text decoding that honours the document's own encoding.
//!
//! Order of precedence: BOM, `Content-Type` charset, in-document declaration
//! (`<meta charset>`, `http-equiv`, or the XML prolog), then UTF-8 if the
//! bytes validate, otherwise windows-1254 (the usual legacy Turkish code page).

use encoding_rs::{Encoding, UTF_8, WINDOWS_1254};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// How many leading bytes are scanned for an in-document declaration.
const SNIFF_LEN: usize = 2048;

static CONTENT_TYPE_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([A-Za-z0-9_\-:.]+)"#).unwrap());

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9_\-:.]+)"#).unwrap()
});

static XML_ENCODING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<\?xml[^>]+encoding\s*=\s*["']([A-Za-z0-9_\-:.]+)["']"#).unwrap()
});

fn label_from(re: &Regex, haystack: &[u8]) -> Option<&'static Encoding> {
    let caps = re.captures(haystack)?;
    Encoding::for_label(caps.get(1)?.as_bytes())
}

/// Pick the encoding for `bytes`, given an optional `Content-Type` header value.
pub fn detect(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((enc, _)) = Encoding::for_bom(bytes) {
        return enc;
    }
    if let Some(enc) = content_type.and_then(|ct| label_from(&CONTENT_TYPE_CHARSET, ct.as_bytes())) {
        return enc;
    }
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    if let Some(enc) = label_from(&XML_ENCODING, head).or_else(|| label_from(&META_CHARSET, head)) {
        return enc;
    }
    if std::str::from_utf8(bytes).is_ok() {
        UTF_8
    } else {
        WINDOWS_1254
    }
}

/// Decode `bytes` into text using [`detect`].
pub fn decode(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = detect(bytes, content_type);
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = used.name(), "Decoded body with replacement characters");
    }
    text.into_owned()
}

//! Markup removal for archive records.
//!
//! The extractor only needs a flattened text view of a whole record, so the
//! stripper works on raw text with regular expressions rather than building
//! a DOM. Lines outside tags (WARC and HTTP headers) pass through untouched.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Turns markup into plain text
pub trait HtmlStripper: Send + Sync {
    /// Return `input` with all markup removed
    fn strip(&self, input: &str) -> String;
}

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static RAW_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(?:/?([A-Za-z][A-Za-z0-9:_-]*)|[!?])[^>]*>").unwrap());

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]{2,6});").unwrap());

/// Tags that start a new line of text when removed
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "title", "tr", "ul",
];

/// Regex-based [`HtmlStripper`].
///
/// Drops comments, `<script>`/`<style>` elements with their content and every
/// tag; block-level tags become line breaks so adjacent paragraphs do not run
/// together. Character references are decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagStripper;

impl HtmlStripper for TagStripper {
    fn strip(&self, input: &str) -> String {
        let text = COMMENT_RE.replace_all(input, "");
        let text = RAW_TEXT_RE.replace_all(&text, "");
        let text = TAG_RE.replace_all(&text, |caps: &Captures| {
            let is_block = caps
                .get(1)
                .map(|name| {
                    let name = name.as_str().to_ascii_lowercase();
                    BLOCK_TAGS.contains(&name.as_str())
                })
                .unwrap_or(false);
            if is_block {
                "\n"
            } else {
                ""
            }
        });
        decode_entities(&text).into_owned()
    }
}

/// Decode named and numeric character references.
///
/// Unknown names and invalid code points are left as written.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        let decoded = if let Some(num) = body.strip_prefix('#') {
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        } else {
            named_entity(body)
        };
        match decoded {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "copy" => '\u{a9}',
        _ => return None,
    };
    Some(c)
}

use std::borrow::Cow;

use google_gmail1::api::{Message, MessagePart};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{email::mime::MimePart, util::truncate_chars};

const RE_BLANK_LINES_STR: &str = r"\n[ \t]*(\n[ \t]*)+";
const RE_TRAILING_SPACE_STR: &str = r"[ \t]+\n";
const RE_IMG_TAG_STR: &str = r#"(?i)<img[^>]*alt=["']([^"']*)["'][^>]*/?>"#;

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(RE_BLANK_LINES_STR).unwrap());
static RE_TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(RE_TRAILING_SPACE_STR).unwrap());
static RE_IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(RE_IMG_TAG_STR).unwrap());
/// Comments, scripts and styles never carry readable text
static SANITIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap()
});

/// Width html2text wraps at; wide enough to keep paragraphs on one line
const HTML_TEXT_WIDTH: usize = 400;

/// A message reduced to the headers and plain text the prompts need
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractedMessage {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: String,
    pub body: String,
}

impl ExtractedMessage {
    /// Extract headers and a normalized body from a format=full gmail record.
    /// Never fails: missing headers and bodies become empty strings.
    pub fn from_gmail_message(msg: &Message) -> Self {
        let id = msg.id.clone().unwrap_or_default();
        let Some(payload) = msg.payload.as_ref() else {
            tracing::debug!("Message {} has no payload", id);
            return Self {
                id,
                ..Default::default()
            };
        };

        let tree = MimePart::from_gmail_part(payload);

        Self {
            id,
            from: get_header(payload, "From").unwrap_or_default(),
            subject: get_header(payload, "Subject").unwrap_or_default(),
            date: get_header(payload, "Date").unwrap_or_default(),
            body: extract_body(&tree),
        }
    }

    /// Length-bounded slice of the body used in prompts
    pub fn excerpt(&self, max_chars: usize) -> &str {
        truncate_chars(&self.body, max_chars)
    }
}

/// Plain text of a part tree.
///
/// Every non-blank text/plain leaf is kept, in document order. Only when the
/// tree has none are the text/html leaves converted and used instead.
pub fn extract_body(tree: &MimePart) -> String {
    let leaves = tree.leaves();

    let plain: Vec<&str> = leaves
        .iter()
        .filter_map(|leaf| match leaf {
            MimePart::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect();

    let body = if !plain.is_empty() {
        plain.join("\n")
    } else {
        leaves
            .iter()
            .filter_map(|leaf| match leaf {
                MimePart::Html(html) if !html.trim().is_empty() => Some(html_to_text(html)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    normalize_whitespace(&body)
}

/// Best-effort markup removal; malformed html still yields text
pub fn html_to_text(html: &str) -> String {
    let html = SANITIZE_RE.replace_all(html, "");
    let html = replace_images(&html);
    html2text::from_read(html.as_bytes(), HTML_TEXT_WIDTH)
}

fn replace_images(body: &str) -> Cow<'_, str> {
    RE_IMG_TAG.replace_all(body, "[An image of $1]")
}

fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = RE_TRAILING_SPACE.replace_all(&text, "\n");
    let text = RE_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Header lookup on the root part, case-insensitive like RFC 5322
fn get_header(part: &MessagePart, name: &str) -> Option<String> {
    part.headers.as_ref()?.iter().find_map(|h| {
        if h.name.as_deref()?.eq_ignore_ascii_case(name) {
            h.value.clone()
        } else {
            None
        }
    })
}

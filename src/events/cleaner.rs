//! Normalisation of single wikitext bullet lines into readable event text.

use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

/// Events shorter than this after cleaning are dropped as noise.
pub const MIN_DESCRIPTION_CHARS: usize = 8;

const MONTHS: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

static DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:\[\[)?({MONTHS})\s+(\d{{1,2}})(?:\]\])?\s*[-–—]\s*"
    ))
    .unwrap()
});
static REF_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<ref[^>]*>.*?</ref>").unwrap());
static REF_SELF_CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<ref[^/>]*/>").unwrap());
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static FILE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\[(?:File|Image):[^\]]+\]\]").unwrap());
static WIKI_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").unwrap());
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"''+").unwrap());
static EDGE_DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-\s]+|[-\s]+$").unwrap());

/// Namespaces whose links carry no prose and are dropped outright.
const HIDDEN_NAMESPACES: [&str; 4] = ["category:", "help:", "portal:", "special:"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedLine {
    /// `"Jan 5"` style date, empty when the line had no date prefix.
    pub date: String,
    pub description: String,
}

/// Clean one wikitext line. Only `*` bullet lines produce output.
///
/// With `keep_date_prefix` the description is rendered as `"Jan 5 - ..."`;
/// otherwise the date is only reported in [`CleanedLine::date`].
pub fn clean_line(raw: &str, keep_date_prefix: bool, max_len: usize) -> Option<CleanedLine> {
    let line = raw.trim().strip_prefix('*')?;
    let mut text = line.trim_start_matches('*').trim().to_string();

    let mut date = String::new();
    if let Some(caps) = DATE_PREFIX.captures(&text) {
        date = format!("{} {}", month_abbrev(&caps[1]), &caps[2]);
        text = text[caps.get(0).map_or(0, |m| m.end())..].trim().to_string();
    }

    let text = htmlize::unescape(&text);
    let text = REF_TAG.replace_all(&text, "");
    let text = REF_SELF_CLOSING.replace_all(&text, "");
    let text = COMMENT.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text = FILE_LINK.replace_all(&text, "");
    let text = strip_templates(&text);
    let text = WIKI_LINK.replace_all(&text, flatten_link);
    let text = CITATION.replace_all(&text, "");
    let text = EMPHASIS.replace_all(&text, "");
    let text = text.replace(['–', '—'], "-");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = EDGE_DASHES.replace_all(&text, "");

    if text.chars().count() < MIN_DESCRIPTION_CHARS {
        return None;
    }

    let description = if keep_date_prefix && !date.is_empty() {
        format!("{date} - {text}")
    } else {
        text.into_owned()
    };

    Some(CleanedLine {
        date,
        description: truncate(description, max_len),
    })
}

/// `"JANUARY"` -> `"Jan"`.
fn month_abbrev(month: &str) -> String {
    let mut chars = month.chars();
    let first = chars.next().map(|c| c.to_ascii_uppercase());
    first
        .into_iter()
        .chain(chars.take(2).map(|c| c.to_ascii_lowercase()))
        .collect()
}

/// `[[target|label]]` -> `label`, `[[target]]` -> `target`, hidden namespaces -> nothing.
fn flatten_link(caps: &Captures<'_>) -> String {
    let inner = caps[1].trim();
    let lowered = inner.to_lowercase();
    if HIDDEN_NAMESPACES.iter().any(|ns| lowered.starts_with(ns)) {
        return String::new();
    }
    match inner.rsplit_once('|') {
        Some((_, label)) => label.trim().to_string(),
        None => inner.to_string(),
    }
}

/// Remove `{{ ... }}` templates, including nested ones.
fn strip_templates(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if rest.starts_with("{{") {
            depth += 1;
            rest = &rest[2..];
        } else if depth > 0 && rest.starts_with("}}") {
            depth -= 1;
            rest = &rest[2..];
        } else {
            if depth == 0 {
                out.push(ch);
            }
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

const ELLIPSIS: &str = "...";

/// Cut to `max_len` characters, ending in `...` when shortened and there is room for it.
fn truncate(text: String, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text;
    }
    if max_len < ELLIPSIS.len() {
        return text.chars().take(max_len).collect::<String>().trim_end().to_string();
    }
    let kept: String = text.chars().take(max_len - ELLIPSIS.len()).collect();
    format!("{}{ELLIPSIS}", kept.trim_end())
}

//! Typed extraction from free-form language-model text.
//!
//! Model output has no guaranteed format, so every routine here ends with a
//! well-typed value:
//! - [`extract_list`] pulls the numbered or dashed items out of a reply and
//!   pads the result to exactly five entries.
//! - [`json_block`] locates the JSON payload, stripping Markdown code fences.
//! - [`parse_outline`] and [`parse_simulated_articles`] decode that payload
//!   and substitute a fixed default when decoding fails.

use crate::models::{Article, Outline};
use crate::utils::{looks_truncated, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Number of entries a list extraction always yields.
pub const LIST_LEN: usize = 5;

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*(.*)$").expect("numbered item pattern is valid"));

/// Result of an extraction that never fails.
///
/// `Default` carries the same type as `Parsed`, so downstream code can use
/// the value without caring which case occurred; `reason` explains the
/// substitution for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Parsed(T),
    Default { value: T, reason: String },
}

impl<T> Extraction<T> {
    pub fn value(&self) -> &T {
        match self {
            Extraction::Parsed(value) | Extraction::Default { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Extraction::Parsed(value) | Extraction::Default { value, .. } => value,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Extraction::Default { .. })
    }

    /// Why the default was substituted, if it was.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Extraction::Parsed(_) => None,
            Extraction::Default { reason, .. } => Some(reason),
        }
    }
}

/// Which list is being extracted; decides the placeholder wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Topics,
    Angles,
}

impl ListKind {
    /// Placeholder for the 1-based position `n`.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            ListKind::Topics => format!("Sujet {n}"),
            ListKind::Angles => format!("Angle {n}"),
        }
    }
}

/// Items found in a reply, padded to [`LIST_LEN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListExtraction {
    pub items: Vec<String>,
    /// How many trailing entries are placeholders.
    pub placeholders: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum LineClass<'a> {
    /// Starts a new item; carries the text after the marker.
    Item(&'a str),
    Continuation,
    Blank,
}

#[derive(Debug)]
enum ScanState {
    ScanningForItem,
    AccumulatingCurrentItem(String),
}

fn classify(line: &str) -> LineClass<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineClass::Blank;
    }
    if let Some(caps) = NUMBERED_ITEM.captures(line) {
        return LineClass::Item(caps.get(1).map_or("", |m| m.as_str()));
    }
    if let Some(rest) = line.strip_prefix('-') {
        return LineClass::Item(rest);
    }
    LineClass::Continuation
}

/// Item value: the text before the first `:`, without emphasis or quotes.
fn clean_item(text: &str) -> String {
    let head = text.split_once(':').map_or(text, |(head, _)| head);
    head.trim()
        .trim_matches(|c: char| matches!(c, '*' | '"' | '«' | '»' | '_') || c.is_whitespace())
        .to_string()
}

/// Extract up to five list items from `text`, padding with placeholders.
///
/// A line is an item when, trimmed, it starts with digits followed by `.`
/// or with `-`. Lines that follow an item without starting a new one are
/// explanation and are dropped, so each item keeps only its leading line.
pub fn extract_list(text: &str, kind: ListKind) -> ListExtraction {
    let mut items: Vec<String> = Vec::with_capacity(LIST_LEN);
    let mut state = ScanState::ScanningForItem;

    for line in text.lines() {
        if items.len() >= LIST_LEN {
            break;
        }
        state = match (state, classify(line)) {
            (previous, LineClass::Item(rest)) => {
                if let ScanState::AccumulatingCurrentItem(done) = previous {
                    items.push(done);
                }
                let item = clean_item(rest);
                if item.is_empty() {
                    ScanState::ScanningForItem
                } else {
                    ScanState::AccumulatingCurrentItem(item)
                }
            }
            (ScanState::AccumulatingCurrentItem(current), LineClass::Continuation) => {
                ScanState::AccumulatingCurrentItem(current)
            }
            (ScanState::AccumulatingCurrentItem(current), LineClass::Blank) => {
                items.push(current);
                ScanState::ScanningForItem
            }
            (ScanState::ScanningForItem, _) => ScanState::ScanningForItem,
        };
    }
    if let ScanState::AccumulatingCurrentItem(current) = state {
        items.push(current);
    }
    items.truncate(LIST_LEN);

    let found = items.len();
    items.extend((found..LIST_LEN).map(|i| kind.placeholder(i + 1)));
    let placeholders = LIST_LEN - found;
    if placeholders > 0 {
        warn!(?kind, found, placeholders, "List reply had too few items; padded with placeholders");
    }
    ListExtraction {
        items,
        placeholders,
    }
}

/// Text up to the next closing fence, or to the end when unterminated.
fn until_fence(text: &str) -> &str {
    text.split("```").next().unwrap_or(text)
}

/// Drop a bare language tag such as `javascript` on the fence's first line.
fn skip_language_tag(inner: &str) -> &str {
    match inner.split_once('\n') {
        Some((first, rest))
            if !first.trim().is_empty()
                && first.trim().chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            rest
        }
        _ => inner,
    }
}

/// Locate the JSON payload of a reply.
///
/// Prefers a fenced block tagged `json`, then any fenced block, then the
/// whole trimmed text.
pub fn json_block(text: &str) -> &str {
    if let Some((_, rest)) = text.split_once("```json") {
        return until_fence(rest).trim();
    }
    if let Some((_, rest)) = text.split_once("```") {
        return skip_language_tag(until_fence(rest)).trim();
    }
    text.trim()
}

/// Decode the JSON payload of a reply.
pub fn parse_json_block<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(json_block(text))
}

fn failure_reason(what: &str, e: &serde_json::Error, text: &str) -> String {
    let hint = if looks_truncated(e) {
        " (the reply looks cut off)"
    } else {
        ""
    };
    format!(
        "{what} could not be parsed: {e}{hint}; received: {}",
        truncate_for_log(text.trim(), 500)
    )
}

/// Decode an outline, falling back to [`Outline::skeleton`] for `topic`.
pub fn parse_outline(text: &str, topic: &str) -> Extraction<Outline> {
    match parse_json_block::<Outline>(text) {
        Ok(outline) => {
            debug!(sections = outline.sections.len(), "Parsed outline");
            Extraction::Parsed(outline)
        }
        Err(e) => {
            warn!(error = %e, response_preview = %truncate_for_log(text, 300), "Outline reply is not valid JSON; using skeleton");
            Extraction::Default {
                value: Outline::skeleton(topic),
                reason: failure_reason("outline", &e, text),
            }
        }
    }
}

/// Decode a simulated search reply, falling back to an empty list.
pub fn parse_simulated_articles(text: &str) -> Extraction<Vec<Article>> {
    match parse_json_block::<Vec<Article>>(text) {
        Ok(articles) => Extraction::Parsed(articles),
        Err(e) => {
            warn!(error = %e, response_preview = %truncate_for_log(text, 300), "Simulated articles reply is not valid JSON");
            Extraction::Default {
                value: Vec::new(),
                reason: failure_reason("simulated articles", &e, text),
            }
        }
    }
}

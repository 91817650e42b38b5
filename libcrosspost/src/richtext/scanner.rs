//! Mention and hashtag span detection

use regex::{CaptureMatches, Regex};
use std::sync::LazyLock;

/// `@handle.bsky.social` mentions and `#tag` hashtags, ASCII only.
///
/// Both alternatives start with a different sigil and neither body can
/// contain the other sigil, so a single left-to-right pass yields the same
/// spans as scanning for each pattern separately and merging by offset.
static SPAN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(?P<handle>[A-Za-z0-9_.\-]+\.bsky\.social)|#(?P<tag>[A-Za-z0-9_]+)")
        .expect("span pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Mention,
    Hashtag,
}

/// A matched mention or hashtag, with byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
    /// The matched text including its sigil, e.g. `@alice.bsky.social`
    pub raw_text: String,
    /// The matched text without its sigil, e.g. `alice.bsky.social` or `rust`
    pub value: String,
}

/// Scan `text` for spans in ascending, non-overlapping order.
///
/// The iterator is lazy; call `scan` again to restart.
pub fn scan(text: &str) -> Spans<'_> {
    Spans {
        captures: SPAN_PATTERN.captures_iter(text),
        last_end: 0,
    }
}

pub struct Spans<'t> {
    captures: CaptureMatches<'static, 't>,
    last_end: usize,
}

impl Iterator for Spans<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        for caps in self.captures.by_ref() {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() < self.last_end {
                continue;
            }

            let (kind, value) = if let Some(handle) = caps.name("handle") {
                (SpanKind::Mention, handle.as_str())
            } else if let Some(tag) = caps.name("tag") {
                (SpanKind::Hashtag, tag.as_str())
            } else {
                continue;
            };

            self.last_end = whole.end();
            return Some(Span {
                start: whole.start(),
                end: whole.end(),
                kind,
                raw_text: whole.as_str().to_string(),
                value: value.to_string(),
            });
        }
        None
    }
}

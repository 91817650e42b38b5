//! Rich-text segment assembly

use serde::Serialize;

use super::resolver::HandleResolver;
use super::scanner::{self, Span, SpanKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Mention { account_id: String },
    Tag { tag: String },
}

/// A piece of post text, optionally annotated as a mention or hashtag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichTextSegment {
    pub text: String,
    pub annotation: Option<Annotation>,
}

impl RichTextSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotation: None,
        }
    }

    pub fn mention(text: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotation: Some(Annotation::Mention {
                account_id: account_id.into(),
            }),
        }
    }

    pub fn tag(text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotation: Some(Annotation::Tag { tag: tag.into() }),
        }
    }

    pub fn is_plain(&self) -> bool {
        self.annotation.is_none()
    }
}

/// Build segments for `text` from its spans.
///
/// Concatenating the returned texts yields `text` exactly. Each mention span
/// costs one resolver call; a mention that does not resolve stays plain
/// text. Hashtags are annotated without any lookup. Empty gaps between
/// adjacent spans produce no segment, but text without spans always yields
/// exactly one plain segment (even when empty).
pub async fn assemble<R>(text: &str, spans: &[Span], resolver: &R) -> Vec<RichTextSegment>
where
    R: HandleResolver + ?Sized,
{
    if spans.is_empty() {
        return vec![RichTextSegment::plain(text)];
    }

    let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;

    for span in spans {
        if span.start < cursor || span.end > text.len() {
            tracing::warn!(
                "Ignoring span {}..{} outside the text or overlapping the previous one",
                span.start,
                span.end
            );
            continue;
        }

        if span.start > cursor {
            segments.push(RichTextSegment::plain(&text[cursor..span.start]));
        }

        let raw = &text[span.start..span.end];
        let segment = match span.kind {
            SpanKind::Mention => match resolver.resolve(&span.value).await {
                Some(account_id) => RichTextSegment::mention(raw, account_id),
                None => RichTextSegment::plain(raw),
            },
            SpanKind::Hashtag => RichTextSegment::tag(raw, span.value.clone()),
        };
        segments.push(segment);
        cursor = span.end;
    }

    if cursor < text.len() {
        segments.push(RichTextSegment::plain(&text[cursor..]));
    }

    segments
}

/// Scan `text` and assemble its segments in one go.
pub async fn rich_text<R>(text: &str, resolver: &R) -> Vec<RichTextSegment>
where
    R: HandleResolver + ?Sized,
{
    let spans: Vec<Span> = scanner::scan(text).collect();
    assemble(text, &spans, resolver).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::resolver::StaticResolver;

    fn concat(segments: &[RichTextSegment]) -> String {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_mention_and_tag_resolved() {
        let resolver = StaticResolver::new().with("alice.bsky.social", "did:plc:123");
        let segments = rich_text("Hello @alice.bsky.social and #world", &resolver).await;

        assert_eq!(
            segments,
            vec![
                RichTextSegment::plain("Hello "),
                RichTextSegment::mention("@alice.bsky.social", "did:plc:123"),
                RichTextSegment::plain(" and "),
                RichTextSegment::tag("#world", "world"),
            ]
        );
    }

    #[tokio::test]
    async fn test_unresolved_mention_becomes_plain_text() {
        let resolver = StaticResolver::new();
        let segments = rich_text("Hello @alice.bsky.social and #world", &resolver).await;

        assert_eq!(
            segments,
            vec![
                RichTextSegment::plain("Hello "),
                RichTextSegment::plain("@alice.bsky.social"),
                RichTextSegment::plain(" and "),
                RichTextSegment::tag("#world", "world"),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_spans_yields_single_plain_segment() {
        let resolver = StaticResolver::new();

        let segments = rich_text("nothing to see", &resolver).await;
        assert_eq!(segments, vec![RichTextSegment::plain("nothing to see")]);

        let segments = rich_text("", &resolver).await;
        assert_eq!(segments, vec![RichTextSegment::plain("")]);
    }

    #[tokio::test]
    async fn test_leading_and_trailing_text() {
        let resolver = StaticResolver::new();
        let segments = rich_text("#first middle #last.", &resolver).await;

        assert_eq!(
            segments,
            vec![
                RichTextSegment::tag("#first", "first"),
                RichTextSegment::plain(" middle "),
                RichTextSegment::tag("#last", "last"),
                RichTextSegment::plain("."),
            ]
        );
    }

    #[tokio::test]
    async fn test_adjacent_spans_have_no_empty_gap() {
        let resolver = StaticResolver::new().with("a.bsky.social", "did:plc:a");
        let segments = rich_text("@a.bsky.social#go", &resolver).await;

        assert_eq!(
            segments,
            vec![
                RichTextSegment::mention("@a.bsky.social", "did:plc:a"),
                RichTextSegment::tag("#go", "go"),
            ]
        );
    }

    #[tokio::test]
    async fn test_overlapping_span_is_skipped() {
        let resolver = StaticResolver::new();
        let text = "#abc";
        let spans = vec![
            Span {
                start: 0,
                end: 4,
                kind: SpanKind::Hashtag,
                raw_text: "#abc".to_string(),
                value: "abc".to_string(),
            },
            Span {
                start: 2,
                end: 4,
                kind: SpanKind::Hashtag,
                raw_text: "bc".to_string(),
                value: "c".to_string(),
            },
        ];

        let segments = assemble(text, &spans, &resolver).await;
        assert_eq!(segments, vec![RichTextSegment::tag("#abc", "abc")]);
        assert_eq!(concat(&segments), text);
    }

    #[tokio::test]
    async fn test_concatenation_reproduces_input() {
        let resolver = StaticResolver::new()
            .with("alice.bsky.social", "did:plc:alice")
            .with("bob.bsky.social", "did:plc:bob");

        let samples = [
            "",
            " ",
            "#",
            "@",
            "plain",
            "#a #b #c",
            "#a#b#c",
            "Hello @alice.bsky.social and #world",
            "@alice.bsky.social@bob.bsky.social",
            "@unknown.bsky.social says hi to @bob.bsky.social #greetings\n",
            "émoji 🎉 #fête @alice.bsky.social — ok",
            "line one\n#two\n\n@bob.bsky.social.",
            "mail me@alice.bsky.social ## #_ #9",
        ];

        for sample in samples {
            let segments = rich_text(sample, &resolver).await;
            assert_eq!(concat(&segments), sample, "lossless for {:?}", sample);
            assert!(!segments.is_empty());
        }
    }

    #[test]
    fn test_annotation_serialization() {
        let segment = RichTextSegment::mention("@a.bsky.social", "did:plc:a");
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["annotation"]["type"], "mention");
        assert_eq!(json["annotation"]["account_id"], "did:plc:a");
        assert!(RichTextSegment::plain("x").is_plain());
    }
}

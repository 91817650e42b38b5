//! Bluesky `app.bsky.richtext.facet` encoding
//!
//! Facet indices are UTF-8 byte offsets into the post text, which is what the
//! segment lengths already are in Rust.

use serde::{Deserialize, Serialize};

use super::assembler::{Annotation, RichTextSegment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

/// One facet per annotated segment, in text order.
pub fn facets_from_segments(segments: &[RichTextSegment]) -> Vec<Facet> {
    let mut facets = Vec::new();
    let mut offset = 0;

    for segment in segments {
        let start = offset;
        offset += segment.text.len();

        let feature = match &segment.annotation {
            Some(Annotation::Mention { account_id }) => FacetFeature::Mention {
                did: account_id.clone(),
            },
            Some(Annotation::Tag { tag }) => FacetFeature::Tag { tag: tag.clone() },
            None => continue,
        };

        facets.push(Facet {
            index: ByteSlice {
                byte_start: start,
                byte_end: offset,
            },
            features: vec![feature],
        });
    }

    facets
}

/// Reassemble the plain text the facets index into
pub fn segments_text(segments: &[RichTextSegment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facets_for_mention_and_tag() {
        let segments = vec![
            RichTextSegment::plain("Hello "),
            RichTextSegment::mention("@alice.bsky.social", "did:plc:123"),
            RichTextSegment::plain(" and "),
            RichTextSegment::tag("#world", "world"),
        ];

        let facets = facets_from_segments(&segments);
        assert_eq!(
            facets,
            vec![
                Facet {
                    index: ByteSlice {
                        byte_start: 6,
                        byte_end: 24
                    },
                    features: vec![FacetFeature::Mention {
                        did: "did:plc:123".to_string()
                    }],
                },
                Facet {
                    index: ByteSlice {
                        byte_start: 29,
                        byte_end: 35
                    },
                    features: vec![FacetFeature::Tag {
                        tag: "world".to_string()
                    }],
                },
            ]
        );
    }

    #[test]
    fn test_plain_segments_produce_no_facets() {
        let segments = vec![
            RichTextSegment::plain("just "),
            RichTextSegment::plain("@nobody.bsky.social"),
        ];
        assert!(facets_from_segments(&segments).is_empty());
    }

    #[test]
    fn test_byte_offsets_with_multibyte_text() {
        let segments = vec![
            RichTextSegment::plain("🎉 "),
            RichTextSegment::tag("#fête", "f"),
        ];
        let facets = facets_from_segments(&segments);

        let text = segments_text(&segments);
        let index = &facets[0].index;
        assert_eq!(index.byte_start, 5);
        assert_eq!(&text[index.byte_start..index.byte_end], "#fête");
    }

    #[test]
    fn test_facet_json_shape() {
        let facet = Facet {
            index: ByteSlice {
                byte_start: 0,
                byte_end: 3,
            },
            features: vec![FacetFeature::Tag {
                tag: "go".to_string(),
            }],
        };

        let json = serde_json::to_value(&facet).unwrap();
        assert_eq!(json["index"]["byteStart"], 0);
        assert_eq!(json["index"]["byteEnd"], 3);
        assert_eq!(json["features"][0]["$type"], "app.bsky.richtext.facet#tag");
        assert_eq!(json["features"][0]["tag"], "go");

        let mention = serde_json::to_value(FacetFeature::Mention {
            did: "did:plc:x".to_string(),
        })
        .unwrap();
        assert_eq!(mention["$type"], "app.bsky.richtext.facet#mention");
        assert_eq!(mention["did"], "did:plc:x");
    }
}

//! Rich text for Bluesky posts
//!
//! Post text is scanned for `@handle.bsky.social` mentions and `#tag`
//! hashtags ([`scanner`]), mentions are resolved to DIDs ([`resolver`]), and
//! the result is assembled into segments that reproduce the original text
//! exactly ([`assembler`]). [`facet`] turns segments into the byte-indexed
//! facets Bluesky stores on a post record.
//!
//! ```no_run
//! use libcrosspost::richtext::{rich_text, facets_from_segments, StaticResolver};
//!
//! # async fn example() {
//! let resolver = StaticResolver::new().with("alice.bsky.social", "did:plc:123");
//! let segments = rich_text("Hello @alice.bsky.social #rust", &resolver).await;
//! let facets = facets_from_segments(&segments);
//! assert_eq!(facets.len(), 2);
//! # }
//! ```

pub mod assembler;
pub mod facet;
pub mod resolver;
pub mod scanner;

pub use assembler::{assemble, rich_text, Annotation, RichTextSegment};
pub use facet::{facets_from_segments, Facet, FacetFeature};
pub use resolver::{normalize_handle, HandleResolver, StaticResolver};
pub use scanner::{scan, Span, SpanKind};

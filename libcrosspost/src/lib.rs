//! Crosspost - publish one post to Mastodon, Twitter and Bluesky
//!
//! This library loads a post and its per-platform mention suffixes, uploads
//! attached images and publishes to each selected platform in turn. A
//! failure on one platform never stops the others.

pub mod config;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod poster;
pub mod richtext;
pub mod secret;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{CrosspostError, PlatformError, Result};
pub use poster::{publish, Completed, Loaded, PlatformSelection};
pub use types::{Post, PlatformKind, PublishResult};

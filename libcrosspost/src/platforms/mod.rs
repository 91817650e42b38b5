//! Platform abstraction and implementations
//!
//! Every platform goes through the same steps: authenticate, validate the
//! text, upload each image, then submit a single post referencing the
//! uploaded media. [`Platform`] is the seam; [`crate::poster::publish`] drives
//! it and turns any error into a failed [`crate::types::PublishResult`].
//!
//! ```no_run
//! use libcrosspost::platforms::{mastodon::MastodonClient, Platform};
//! use libcrosspost::types::MediaFile;
//!
//! # async fn example() -> Result<(), libcrosspost::error::PlatformError> {
//! let mut platform = MastodonClient::new(
//!     "https://mastodon.social".to_string(),
//!     "access-token".to_string(),
//! )?;
//! platform.authenticate().await?;
//! let media = MediaFile::inspect(std::path::Path::new("cat.png"))?;
//! let handle = platform.upload_attachment(&media).await?;
//! let post_id = platform.post("Hello!", &[handle]).await?;
//! println!("Posted: {}", post_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::config::Config;
use crate::error::PlatformError;
use crate::secret::SecretProvider;
use crate::types::{MediaFile, MediaHandle, PlatformKind};

pub mod bluesky;
pub mod mastodon;
pub mod twitter;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Establish or verify the session. Called once before anything else.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when credentials are rejected.
    async fn authenticate(&mut self) -> PlatformResult<()>;

    /// Upload one image and return the handle to reference it when posting.
    async fn upload_attachment(&self, media: &MediaFile) -> PlatformResult<MediaHandle>;

    /// Submit the post. `media` is empty for text-only posts.
    ///
    /// Returns the platform-specific post ID (status id, tweet id, AT URI).
    async fn post(&self, content: &str, media: &[MediaHandle]) -> PlatformResult<String>;

    /// Lowercase platform identifier, e.g. "mastodon"
    fn name(&self) -> &str;

    /// Maximum number of characters per post, if the platform has one
    fn character_limit(&self) -> Option<usize>;

    fn validate_content(&self, content: &str) -> PlatformResult<()> {
        if content.trim().is_empty() {
            return Err(PlatformError::Validation(
                "Content cannot be empty".to_string(),
            ));
        }

        if let Some(limit) = self.character_limit() {
            let count = content.chars().count();
            if count > limit {
                return Err(PlatformError::Validation(format!(
                    "Content exceeds {}'s {} character limit (current: {} characters)",
                    self.name(),
                    limit,
                    count
                )));
            }
        }

        Ok(())
    }

    /// Maximum number of images per post
    fn max_attachments(&self) -> usize {
        4
    }

    /// Maximum size of a single image in bytes
    fn max_attachment_size(&self) -> u64 {
        40 * 1024 * 1024
    }

    /// Check an image against this platform's limits before uploading it.
    fn validate_attachment(&self, media: &MediaFile) -> PlatformResult<()> {
        if media.size > self.max_attachment_size() {
            return Err(PlatformError::Validation(format!(
                "{} is {} bytes, over {}'s limit of {} bytes",
                media.path.display(),
                media.size,
                self.name(),
                self.max_attachment_size()
            )));
        }
        Ok(())
    }
}

/// Build the client for `kind` from configuration.
///
/// `secrets` is only consulted by platforms that log in interactively
/// (Bluesky); it is called lazily during authentication.
pub fn create_platform(
    kind: PlatformKind,
    config: &Config,
    secrets: Box<dyn SecretProvider>,
) -> PlatformResult<Box<dyn Platform>> {
    match kind {
        PlatformKind::Mastodon => {
            let client = mastodon::MastodonClient::from_config(config.mastodon()?)?;
            Ok(Box::new(client))
        }
        PlatformKind::Twitter => {
            let client = twitter::TwitterClient::from_config(config.twitter()?)?;
            Ok(Box::new(client))
        }
        PlatformKind::Bluesky => {
            let client = bluesky::BlueskyClient::from_config(config.bluesky()?, secrets)?;
            Ok(Box::new(client))
        }
    }
}

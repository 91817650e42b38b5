//! Cross-platform posting orchestration
//!
//! [`publish`] drives one platform through validate, authenticate, upload
//! and post, and is the boundary where errors become a failed
//! [`PublishResult`]. [`Loaded`] runs it for every selected platform in the
//! fixed order Mastodon, Twitter, Bluesky and yields a [`Completed`] run.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::PlatformError;
use crate::platforms::{Platform, PlatformResult};
use crate::types::{MediaFile, Post, PlatformKind, PublishResult};

/// Which platforms to post to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformSelection {
    pub mastodon: bool,
    pub twitter: bool,
    pub bluesky: bool,
}

impl PlatformSelection {
    pub fn all() -> Self {
        Self {
            mastodon: true,
            twitter: true,
            bluesky: true,
        }
    }

    /// Combine command-line flags; `all` selects every platform.
    pub fn from_flags(all: bool, mastodon: bool, twitter: bool, bluesky: bool) -> Self {
        if all {
            Self::all()
        } else {
            Self {
                mastodon,
                twitter,
                bluesky,
            }
        }
    }

    pub fn contains(&self, platform: PlatformKind) -> bool {
        match platform {
            PlatformKind::Mastodon => self.mastodon,
            PlatformKind::Twitter => self.twitter,
            PlatformKind::Bluesky => self.bluesky,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.mastodon || self.twitter || self.bluesky)
    }

    /// Selected platforms in publishing order
    pub fn targets(&self) -> Vec<PlatformKind> {
        PlatformKind::ALL
            .into_iter()
            .filter(|platform| self.contains(*platform))
            .collect()
    }
}

/// Publish `text` with `images` to one platform.
///
/// Never fails: any error along the way is logged and reported as a failed
/// result carrying the error message.
pub async fn publish(platform: &mut dyn Platform, text: &str, images: &[PathBuf]) -> PublishResult {
    let name = platform.name().to_string();

    match try_publish(platform, text, images).await {
        Ok(post_id) => {
            info!("Posted to {}: {}", name, post_id);
            PublishResult::success(&name, post_id)
        }
        Err(e) => {
            warn!("Failed to post to {}: {}", name, e);
            PublishResult::failure(&name, e)
        }
    }
}

async fn try_publish(
    platform: &mut dyn Platform,
    text: &str,
    images: &[PathBuf],
) -> PlatformResult<String> {
    // Local checks run before anything is prompted for or sent
    platform.validate_content(text)?;

    if images.len() > platform.max_attachments() {
        return Err(PlatformError::Validation(format!(
            "{} accepts at most {} images per post (got {})",
            platform.name(),
            platform.max_attachments(),
            images.len()
        )));
    }

    let media = images
        .iter()
        .map(|path| {
            let media = MediaFile::inspect(path)?;
            platform.validate_attachment(&media)?;
            Ok(media)
        })
        .collect::<PlatformResult<Vec<_>>>()?;

    platform.authenticate().await?;
    // Some limits are only learned from the server
    platform.validate_content(text)?;

    let mut handles = Vec::with_capacity(media.len());
    for file in &media {
        handles.push(platform.upload_attachment(file).await?);
    }

    platform.post(text, &handles).await
}

/// A post and its targets, ready to run
#[derive(Debug, Clone)]
pub struct Loaded {
    post: Post,
    targets: Vec<PlatformKind>,
}

/// Every target has been attempted exactly once
#[derive(Debug, Clone)]
pub struct Completed {
    results: Vec<PublishResult>,
}

impl Loaded {
    pub fn new(post: Post, selection: PlatformSelection) -> Self {
        Self {
            post,
            targets: selection.targets(),
        }
    }

    pub fn targets(&self) -> &[PlatformKind] {
        &self.targets
    }

    /// Publish to each target in order.
    ///
    /// `connect` is called once per target, right before publishing to it,
    /// to build the client. A connect error becomes that platform's failed
    /// result; the remaining targets still run.
    pub async fn run<F>(self, mut connect: F) -> Completed
    where
        F: FnMut(PlatformKind) -> PlatformResult<Box<dyn Platform>>,
    {
        let mut results = Vec::with_capacity(self.targets.len());

        for kind in &self.targets {
            let result = match connect(*kind) {
                Ok(mut platform) => {
                    let text = self.post.text_for(*kind);
                    publish(platform.as_mut(), &text, self.post.image_paths()).await
                }
                Err(e) => {
                    warn!("Cannot post to {}: {}", kind, e);
                    PublishResult::failure(kind.as_str(), e)
                }
            };
            results.push(result);
        }

        Completed { results }
    }
}

impl Completed {
    /// One result per target, in publishing order
    pub fn results(&self) -> &[PublishResult] {
        &self.results
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PublishResult> {
        self.results.iter().filter(|r| !r.ok)
    }

    /// 0 when every platform succeeded, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }
}

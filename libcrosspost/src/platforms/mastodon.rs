//! Mastodon platform implementation
//!
//! This module provides integration with Mastodon using the megalodon
//! library. Images are uploaded through the media endpoint first and the
//! returned media ids are attached to the status.

use async_trait::async_trait;
use megalodon::entities::UploadMedia;
use megalodon::megalodon::{PostStatusInputOptions, PostStatusOutput};
use megalodon::{Megalodon, SNS};

use crate::config::MastodonConfig;
use crate::error::PlatformError;
use crate::platforms::{Platform, PlatformResult};
use crate::types::{MediaFile, MediaHandle};

/// Character limit used until the instance reports its own
pub const DEFAULT_CHARACTER_LIMIT: usize = 500;

/// Mastodon platform client
pub struct MastodonClient {
    /// The megalodon client for API interactions
    client: Box<dyn Megalodon + Send + Sync>,

    /// The instance URL (e.g., "https://mastodon.social")
    instance_url: String,

    /// Character limit for posts, known once the instance has been asked
    character_limit: Option<usize>,
}

impl MastodonClient {
    /// Create a new Mastodon client
    ///
    /// # Arguments
    ///
    /// * `instance_url` - The base URL of the Mastodon instance (e.g., "https://mastodon.social")
    /// * `access_token` - OAuth access token for authentication
    ///
    /// The character limit is unknown until [`Platform::authenticate`] asks
    /// the instance, falling back to 500.
    pub fn new(instance_url: String, access_token: String) -> PlatformResult<Self> {
        let client = megalodon::generator(
            SNS::Mastodon,
            instance_url.clone(),
            Some(access_token),
            None,
        )
        .map_err(|e| {
            PlatformError::Authentication(format!("Failed to create Mastodon client: {:?}", e))
        })?;

        Ok(Self {
            client,
            instance_url,
            character_limit: None,
        })
    }

    /// Create a Mastodon client from configuration
    pub fn from_config(config: &MastodonConfig) -> PlatformResult<Self> {
        Self::new(config.instance_url(), config.access_token.trim().to_string())
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Fetch the instance's character limit
    ///
    /// A failure here is not fatal; the current limit is kept.
    pub async fn fetch_instance_info(&mut self) -> PlatformResult<()> {
        let response = self
            .client
            .get_instance()
            .await
            .map_err(|e| map_megalodon_error(e, "fetch instance info"))?;

        let limit = response.json.configuration.statuses.max_characters as usize;
        if limit > 0 {
            self.character_limit = Some(limit);
        }

        Ok(())
    }
}

#[async_trait]
impl Platform for MastodonClient {
    async fn authenticate(&mut self) -> PlatformResult<()> {
        self.client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "authenticate"))?;

        if let Err(e) = self.fetch_instance_info().await {
            tracing::debug!(
                "Using default Mastodon character limit of {}: {}",
                DEFAULT_CHARACTER_LIMIT,
                e
            );
        }
        self.character_limit.get_or_insert(DEFAULT_CHARACTER_LIMIT);

        Ok(())
    }

    async fn upload_attachment(&self, media: &MediaFile) -> PlatformResult<MediaHandle> {
        let path = media.path.to_string_lossy().into_owned();
        let response = self
            .client
            .upload_media(path, None)
            .await
            .map_err(|e| map_megalodon_error(e, "upload media"))?;

        let media_id = match response.json {
            UploadMedia::Attachment(attachment) => attachment.id,
            UploadMedia::AsyncAttachment(attachment) => attachment.id,
        };

        tracing::debug!("Uploaded {} to Mastodon as {}", media.path.display(), media_id);
        Ok(MediaHandle::Id(media_id))
    }

    async fn post(&self, content: &str, media: &[MediaHandle]) -> PlatformResult<String> {
        let media_ids = media_ids(media)?;

        let options = (!media_ids.is_empty()).then(|| PostStatusInputOptions {
            media_ids: Some(media_ids),
            ..Default::default()
        });

        let response = self
            .client
            .post_status(content.to_string(), options.as_ref())
            .await
            .map_err(|e| map_megalodon_error(e, "post status"))?;

        let post_id = match response.json {
            PostStatusOutput::Status(status) => status.id,
            PostStatusOutput::ScheduledStatus(scheduled) => scheduled.id,
        };

        Ok(post_id)
    }

    fn name(&self) -> &str {
        "mastodon"
    }

    fn character_limit(&self) -> Option<usize> {
        self.character_limit
    }
}

fn media_ids(media: &[MediaHandle]) -> PlatformResult<Vec<String>> {
    media
        .iter()
        .map(|handle| match handle {
            MediaHandle::Id(id) => Ok(id.clone()),
            MediaHandle::Blob(_) => Err(PlatformError::Posting(
                "Mastodon cannot attach a blob reference".to_string(),
            )),
        })
        .collect()
}

/// Map megalodon errors to PlatformError
///
/// - HTTP 401/403 → `PlatformError::Authentication`
/// - HTTP 413/422 → `PlatformError::Validation`
/// - HTTP 429 → `PlatformError::RateLimit`
/// - HTTP 5xx → `PlatformError::Network`
/// - anything else is classified from the message text
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> PlatformError {
    let error_str = error.to_string();
    let error_lower = error_str.to_lowercase();

    match extract_http_status(&error_str) {
        Some(401) | Some(403) => PlatformError::Authentication(format!(
            "Mastodon authentication failed ({}): {}. \
                    Suggestion: Verify MASTODON_ACCESS_TOKEN is valid and has not been revoked.",
            context, error_str
        )),
        Some(413) | Some(422) => PlatformError::Validation(format!(
            "Mastodon rejected the request ({}): {}",
            context, error_str
        )),
        Some(429) => PlatformError::RateLimit(format!(
            "Mastodon rate limit exceeded ({}): {}. \
                    Suggestion: Wait a few minutes before retrying.",
            context, error_str
        )),
        Some(500..=599) => PlatformError::Network(format!(
            "Mastodon server error ({}): {}",
            context, error_str
        )),
        Some(_) => {
            PlatformError::Network(format!("Mastodon HTTP error ({}): {}", context, error_str))
        }
        None => {
            if error_lower.contains("unauthorized")
                || error_lower.contains("forbidden")
                || error_lower.contains("token")
            {
                PlatformError::Authentication(format!(
                    "Mastodon authentication failed ({}): {}",
                    context, error_str
                ))
            } else if error_lower.contains("parse")
                || error_lower.contains("json")
                || error_lower.contains("deserialize")
            {
                PlatformError::Posting(format!(
                    "Mastodon response parse error ({}): {}",
                    context, error_str
                ))
            } else if context == "upload media" {
                PlatformError::Upload(format!("Mastodon ({}): {}", context, error_str))
            } else {
                PlatformError::Network(format!(
                    "Mastodon error ({}): {}. \
                        Suggestion: Check your network connection and MASTODON_BASE_URL.",
                    context, error_str
                ))
            }
        }
    }
}

/// Extract an HTTP status code from an error message
///
/// Looks for patterns like "HTTP 401", "status 403" or a standalone "401:".
fn extract_http_status(error_str: &str) -> Option<u16> {
    let prefixes = ["HTTP ", "status ", "code: ", "status_code: "];

    for prefix in &prefixes {
        if let Some(pos) = error_str.find(prefix) {
            let after_prefix = &error_str[pos + prefix.len()..];
            if let Some(code) = after_prefix
                .get(0..3)
                .and_then(|code| code.parse::<u16>().ok())
                .filter(|code| (100..=599).contains(code))
            {
                return Some(code);
            }
        }
    }

    let bytes = error_str.as_bytes();
    for (i, window) in bytes.windows(4).enumerate() {
        let is_code = window[..3].iter().all(u8::is_ascii_digit)
            && (window[3] == b':' || window[3] == b' ')
            && (i == 0 || !bytes[i - 1].is_ascii_digit());
        if !is_code {
            continue;
        }
        let code = std::str::from_utf8(&window[..3])
            .ok()
            .and_then(|s| s.parse::<u16>().ok());
        if let Some(code) = code.filter(|c| (100..=599).contains(c)) {
            return Some(code);
        }
    }

    None
}

//! Twitter (X) platform implementation
//!
//! Tweets and images both go through the v2 API (`/2/tweets`,
//! `/2/media/upload`); the v1.1 `upload.twitter.com` media endpoint has been
//! retired. Every request is signed with OAuth 1.0a user context.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TwitterConfig;
use crate::error::PlatformError;
use crate::platforms::{Platform, PlatformResult};
use crate::types::{MediaFile, MediaHandle};

pub mod oauth;

use oauth::OAuthSigner;

pub const API_BASE_URL: &str = "https://api.x.com";

pub const CHARACTER_LIMIT: usize = 280;
pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia>,
}

#[derive(Debug, Serialize)]
struct TweetMedia {
    media_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct UploadedMedia {
    id: String,
}

/// Twitter platform client
pub struct TwitterClient {
    http: Client,
    signer: OAuthSigner,
    api_base: String,
    username: Option<String>,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig) -> PlatformResult<Self> {
        let http = Client::builder()
            .user_agent(format!("crosspost/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            signer: OAuthSigner::new(config),
            api_base: API_BASE_URL.to_string(),
            username: None,
        })
    }

    /// Create a Twitter client from configuration
    ///
    /// `bearer_token` is not used: posting and uploading need user context.
    pub fn from_config(config: &TwitterConfig) -> PlatformResult<Self> {
        Self::new(config)
    }

    /// Username of the authenticated account, once known
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn handle_response<T: DeserializeOwned>(
        response: Response,
        context: &str,
    ) -> PlatformResult<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(|e| {
                PlatformError::Posting(format!("Twitter {} returned unexpected JSON: {}", context, e))
            })
        } else {
            Err(PlatformError::from_status(
                "Twitter",
                context,
                status.as_u16(),
                &api_error_message(&bytes),
            ))
        }
    }
}

/// Pull a readable message out of a problem document or an error list.
fn api_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct ErrorResponse {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        detail: Option<String>,
        #[serde(default)]
        errors: Option<Vec<serde_json::Value>>,
    }

    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(parsed) => parsed
            .detail
            .or(parsed.title)
            .or_else(|| {
                parsed.errors.and_then(|errors| {
                    errors
                        .first()
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
            })
            .unwrap_or_default(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

fn tweet_request<'a>(content: &'a str, media: &[MediaHandle]) -> PlatformResult<CreateTweetRequest<'a>> {
    let media_ids = media
        .iter()
        .map(|handle| match handle {
            MediaHandle::Id(id) => Ok(id.clone()),
            MediaHandle::Blob(_) => Err(PlatformError::Posting(
                "Twitter cannot attach a blob reference".to_string(),
            )),
        })
        .collect::<PlatformResult<Vec<_>>>()?;

    Ok(CreateTweetRequest {
        text: content,
        media: (!media_ids.is_empty()).then_some(TweetMedia { media_ids }),
    })
}

#[async_trait]
impl Platform for TwitterClient {
    async fn authenticate(&mut self) -> PlatformResult<()> {
        let url = self.endpoint("/2/users/me");
        let auth = self.signer.sign("GET", &url, &[])?;

        let response = self
            .http
            .get(&url)
            .header("Authorization", auth)
            .send()
            .await?;
        let user: DataEnvelope<User> = Self::handle_response(response, "authenticate").await?;

        debug!(user_id = %user.data.id, "Authenticated to Twitter as @{}", user.data.username);
        self.username = Some(user.data.username);
        Ok(())
    }

    async fn upload_attachment(&self, media: &MediaFile) -> PlatformResult<MediaHandle> {
        let bytes = media.read().await?;
        let part = Part::bytes(bytes)
            .file_name(media.file_name())
            .mime_str(media.mime_str())?;
        let form = Form::new()
            .text("media_category", "tweet_image")
            .part("media", part);

        // Multipart fields are not part of the OAuth signature base
        let url = self.endpoint("/2/media/upload");
        let auth = self.signer.sign("POST", &url, &[])?;
        let response = self
            .http
            .post(&url)
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await?;

        let uploaded: DataEnvelope<UploadedMedia> = Self::handle_response(response, "media upload")
            .await
            .map_err(|e| match e {
                PlatformError::Posting(msg) => PlatformError::Upload(msg),
                other => other,
            })?;

        debug!("Uploaded {} to Twitter as {}", media.path.display(), uploaded.data.id);
        Ok(MediaHandle::Id(uploaded.data.id))
    }

    async fn post(&self, content: &str, media: &[MediaHandle]) -> PlatformResult<String> {
        let request = tweet_request(content, media)?;
        let url = self.endpoint("/2/tweets");
        let auth = self.signer.sign("POST", &url, &[])?;

        let response = self
            .http
            .post(&url)
            .header("Authorization", auth)
            .json(&request)
            .send()
            .await?;

        let created: DataEnvelope<CreatedTweet> =
            Self::handle_response(response, "create tweet").await?;
        Ok(created.data.id)
    }

    fn name(&self) -> &str {
        "twitter"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }

    fn max_attachment_size(&self) -> u64 {
        MAX_IMAGE_SIZE
    }
}

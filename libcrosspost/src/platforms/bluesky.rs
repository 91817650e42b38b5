//! Bluesky platform implementation
//!
//! Talks XRPC to the account's PDS directly. The API surface the client
//! needs is small and sits behind [`AtprotoApi`] so that login and posting
//! can be exercised without a network.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Mutex;

use crate::config::BlueskyConfig;
use crate::error::PlatformError;
use crate::platforms::{Platform, PlatformResult};
use crate::richtext::{facets_from_segments, rich_text, Facet, HandleResolver};
use crate::secret::SecretProvider;
use crate::types::{MediaFile, MediaHandle};

pub const CHARACTER_LIMIT: usize = 300;
pub const MAX_IMAGE_SIZE: u64 = 1_000_000;
pub const MAX_LOGIN_ATTEMPTS: usize = 3;

pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// An authenticated PDS session
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    access_jwt: String,
}

impl Session {
    pub fn new(did: impl Into<String>, handle: impl Into<String>, access_jwt: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            handle: handle.into(),
            access_jwt: access_jwt.into(),
        }
    }

    pub fn access_jwt(&self) -> &str {
        &self.access_jwt
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// The XRPC calls used for posting
#[async_trait]
pub trait AtprotoApi: Send + Sync {
    /// `com.atproto.server.createSession`
    async fn create_session(&self, identifier: &str, password: &SecretString)
        -> PlatformResult<Session>;

    /// `com.atproto.repo.uploadBlob`, returning the blob reference object
    async fn upload_blob(&self, session: &Session, bytes: Vec<u8>, mime: &str)
        -> PlatformResult<Value>;

    /// `com.atproto.repo.createRecord` in the post collection, returning the AT URI
    async fn create_record(&self, session: &Session, record: Value) -> PlatformResult<String>;

    /// `com.atproto.identity.resolveHandle`, returning the DID
    async fn resolve_handle(&self, handle: &str) -> PlatformResult<String>;
}

/// XRPC over HTTPS against a PDS
pub struct XrpcClient {
    http: Client,
    pds_url: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    blob: Value,
}

#[derive(Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

#[derive(Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

impl XrpcClient {
    pub fn new(pds_url: impl Into<String>) -> PlatformResult<Self> {
        let http = Client::builder()
            .user_agent(format!("crosspost/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            pds_url: pds_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.pds_url, method)
    }

    async fn handle_response<T: DeserializeOwned>(
        response: Response,
        context: &str,
    ) -> PlatformResult<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(|e| {
                PlatformError::Posting(format!("Bluesky {} returned unexpected JSON: {}", context, e))
            })
        } else {
            Err(PlatformError::from_status(
                "Bluesky",
                context,
                status.as_u16(),
                &xrpc_error_message(&bytes),
            ))
        }
    }
}

/// `{"error": "InvalidRequest", "message": "..."}` → `InvalidRequest: ...`
fn xrpc_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct XrpcError {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    }

    match serde_json::from_slice::<XrpcError>(body) {
        Ok(XrpcError {
            error: Some(error),
            message: Some(message),
        }) => format!("{}: {}", error, message),
        Ok(XrpcError { error, message }) => error.or(message).unwrap_or_default(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

#[async_trait]
impl AtprotoApi for XrpcClient {
    async fn create_session(
        &self,
        identifier: &str,
        password: &SecretString,
    ) -> PlatformResult<Session> {
        let body = json!({
            "identifier": identifier,
            "password": password.expose_secret(),
        });

        let response = self
            .http
            .post(self.endpoint("com.atproto.server.createSession"))
            .json(&body)
            .send()
            .await?;

        Self::handle_response(response, "login").await
    }

    async fn upload_blob(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        mime: &str,
    ) -> PlatformResult<Value> {
        let response = self
            .http
            .post(self.endpoint("com.atproto.repo.uploadBlob"))
            .bearer_auth(session.access_jwt())
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await?;

        let uploaded: BlobResponse = Self::handle_response(response, "blob upload")
            .await
            .map_err(|e| match e {
                PlatformError::Posting(msg) => PlatformError::Upload(msg),
                other => other,
            })?;
        Ok(uploaded.blob)
    }

    async fn create_record(&self, session: &Session, record: Value) -> PlatformResult<String> {
        let body = json!({
            "repo": session.did,
            "collection": POST_COLLECTION,
            "record": record,
        });

        let response = self
            .http
            .post(self.endpoint("com.atproto.repo.createRecord"))
            .bearer_auth(session.access_jwt())
            .json(&body)
            .send()
            .await?;

        let created: CreateRecordResponse = Self::handle_response(response, "create post").await?;
        Ok(created.uri)
    }

    async fn resolve_handle(&self, handle: &str) -> PlatformResult<String> {
        let response = self
            .http
            .get(self.endpoint("com.atproto.identity.resolveHandle"))
            .query(&[("handle", handle)])
            .send()
            .await?;

        let resolved: ResolveHandleResponse = Self::handle_response(response, "resolve handle")
            .await
            .map_err(|e| PlatformError::Resolution(e.to_string()))?;
        Ok(resolved.did)
    }
}

/// Build an `app.bsky.feed.post` record.
///
/// `facets` and `embed` are left out entirely when there is nothing to put
/// in them.
pub fn post_record(text: &str, facets: &[Facet], images: &[Value], created_at: DateTime<Utc>) -> Value {
    let mut record = json!({
        "$type": POST_COLLECTION,
        "text": text,
        "createdAt": created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    });

    if !facets.is_empty() {
        record["facets"] = json!(facets);
    }

    if !images.is_empty() {
        let images: Vec<Value> = images
            .iter()
            .map(|blob| json!({ "image": blob, "alt": "" }))
            .collect();
        record["embed"] = json!({
            "$type": "app.bsky.embed.images",
            "images": images,
        });
    }

    record
}

/// Bluesky platform client
pub struct BlueskyClient {
    api: Box<dyn AtprotoApi>,
    handle: String,
    secrets: Mutex<Box<dyn SecretProvider>>,
    session: Option<Session>,
}

impl BlueskyClient {
    /// Create a new Bluesky client
    ///
    /// # Arguments
    ///
    /// * `api` - XRPC transport
    /// * `handle` - The Bluesky handle (e.g., "user.bsky.social")
    /// * `secrets` - Asked for the password at login, once per attempt
    pub fn new(api: Box<dyn AtprotoApi>, handle: String, secrets: Box<dyn SecretProvider>) -> Self {
        Self {
            api,
            handle,
            secrets: Mutex::new(secrets),
            session: None,
        }
    }

    pub fn from_config(
        config: &BlueskyConfig,
        secrets: Box<dyn SecretProvider>,
    ) -> PlatformResult<Self> {
        let api = XrpcClient::new(config.pds_url())?;
        Ok(Self::new(Box::new(api), config.normalized_handle(), secrets))
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn require_session(&self) -> PlatformResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| PlatformError::Authentication("Not authenticated".to_string()))
    }

    fn next_password(&self, prompt: &str) -> PlatformResult<SecretString> {
        let mut secrets = self.secrets.lock().map_err(|_| {
            PlatformError::Authentication("Password source is unavailable".to_string())
        })?;
        secrets.secret(prompt)
    }
}

#[async_trait]
impl HandleResolver for BlueskyClient {
    async fn lookup(&self, handle: &str) -> Result<String, PlatformError> {
        self.api.resolve_handle(handle).await
    }
}

#[async_trait]
impl Platform for BlueskyClient {
    /// Log in, asking for the password up to three times.
    ///
    /// An empty entry or a rejected password is reported and asked for
    /// again; any other failure (network, password source) ends the login
    /// immediately.
    async fn authenticate(&mut self) -> PlatformResult<()> {
        let prompt = format!("Bluesky {} password: ", self.handle);

        for attempt in 1..=MAX_LOGIN_ATTEMPTS {
            let password = self.next_password(&prompt)?;
            if password.expose_secret().is_empty() {
                tracing::warn!(
                    attempt,
                    max_attempts = MAX_LOGIN_ATTEMPTS,
                    "Empty Bluesky password entered"
                );
                continue;
            }

            match self.api.create_session(&self.handle, &password).await {
                Ok(session) => {
                    tracing::debug!(did = %session.did, "Bluesky session created for {}", self.handle);
                    self.session = Some(session);
                    return Ok(());
                }
                Err(e) if e.is_authentication() => {
                    tracing::warn!(
                        attempt,
                        max_attempts = MAX_LOGIN_ATTEMPTS,
                        "Bluesky login rejected: {}",
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(PlatformError::Authentication(format!(
            "Bluesky login for {} failed after {} attempts",
            self.handle, MAX_LOGIN_ATTEMPTS
        )))
    }

    async fn upload_attachment(&self, media: &MediaFile) -> PlatformResult<MediaHandle> {
        let session = self.require_session()?;
        let bytes = media.read().await?;

        let blob = self.api.upload_blob(session, bytes, media.mime_str()).await?;
        tracing::debug!("Uploaded {} to Bluesky", media.path.display());
        Ok(MediaHandle::Blob(blob))
    }

    async fn post(&self, content: &str, media: &[MediaHandle]) -> PlatformResult<String> {
        let session = self.require_session()?;

        let images = media
            .iter()
            .map(|handle| match handle {
                MediaHandle::Blob(blob) => Ok(blob.clone()),
                MediaHandle::Id(_) => Err(PlatformError::Posting(
                    "Bluesky needs blob references, not media ids".to_string(),
                )),
            })
            .collect::<PlatformResult<Vec<_>>>()?;

        let segments = rich_text(content, self).await;
        let facets = facets_from_segments(&segments);
        tracing::debug!("Posting to Bluesky with {} facets", facets.len());

        let record = post_record(content, &facets, &images, Utc::now());
        let uri = self.api.create_record(session, record).await?;

        tracing::debug!("Posted to Bluesky: {}", uri);
        Ok(uri)
    }

    fn name(&self) -> &str {
        "bluesky"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }

    fn max_attachment_size(&self) -> u64 {
        MAX_IMAGE_SIZE
    }
}

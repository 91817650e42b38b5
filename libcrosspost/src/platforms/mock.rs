//! Mock platform implementation for testing
//!
//! This module provides a configurable mock platform that can simulate
//! successes and failures at each publishing step (authentication, upload,
//! posting). It's designed for use in integration tests
//! to verify cross-posting logic without requiring actual platform
//! credentials or network access.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::PlatformError;
use crate::platforms::bluesky::{AtprotoApi, Session, POST_COLLECTION};
use crate::platforms::{Platform, PlatformResult};
use crate::types::{MediaFile, MediaHandle};

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name (e.g., "mastodon", "mock-bluesky")
    pub name: String,

    /// Whether authentication should succeed
    pub auth_succeeds: bool,

    /// Whether uploading attachments should succeed
    pub upload_succeeds: bool,

    /// Whether posting should succeed
    pub post_succeeds: bool,

    /// Error to return on authentication failure
    pub auth_error: Option<String>,

    /// Error to return on upload failure
    pub upload_error: Option<String>,

    /// Error to return on posting failure
    pub post_error: Option<String>,

    /// Character limit for validation
    pub character_limit: Option<usize>,

    /// Maximum attachments per post
    pub max_attachments: usize,

    /// Number of times authenticate has been called
    pub auth_call_count: Arc<Mutex<usize>>,

    /// Number of times upload_attachment has been called
    pub upload_call_count: Arc<Mutex<usize>>,

    /// Number of times post has been called
    pub post_call_count: Arc<Mutex<usize>>,

    /// Posts that have been made (for verification)
    pub posted_content: Arc<Mutex<Vec<String>>>,

    /// Media handles passed with each post
    pub posted_media: Arc<Mutex<Vec<Vec<MediaHandle>>>>,

    /// Files that were uploaded, in order
    pub uploaded_files: Arc<Mutex<Vec<PathBuf>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_succeeds: true,
            upload_succeeds: true,
            post_succeeds: true,
            auth_error: None,
            upload_error: None,
            post_error: None,
            character_limit: None,
            max_attachments: 4,
            auth_call_count: Arc::new(Mutex::new(0)),
            upload_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            posted_content: Arc::new(Mutex::new(Vec::new())),
            posted_media: Arc::new(Mutex::new(Vec::new())),
            uploaded_files: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
    authenticated: bool,
}

impl MockPlatform {
    /// Create a new mock platform with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails authentication
    pub fn auth_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            auth_succeeds: false,
            auth_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails every attachment upload
    pub fn upload_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            upload_succeeds: false,
            upload_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails posting
    pub fn post_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            post_succeeds: false,
            post_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform with a character limit
    pub fn with_limit(name: &str, limit: usize) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            character_limit: Some(limit),
            ..Default::default()
        })
    }

    /// Shared configuration, including the call counters
    ///
    /// Clone it before boxing the platform to keep observing calls.
    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Get the number of times authenticate was called
    pub fn auth_call_count(&self) -> usize {
        *lock(&self.config.auth_call_count)
    }

    /// Get the number of times upload_attachment was called
    pub fn upload_call_count(&self) -> usize {
        *lock(&self.config.upload_call_count)
    }

    /// Get the number of times post was called
    pub fn post_call_count(&self) -> usize {
        *lock(&self.config.post_call_count)
    }

    /// Get all content that was posted
    pub fn posted_content(&self) -> Vec<String> {
        lock(&self.config.posted_content).clone()
    }

    /// Get the media handles passed with each post
    pub fn posted_media(&self) -> Vec<Vec<MediaHandle>> {
        lock(&self.config.posted_media).clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn authenticate(&mut self) -> PlatformResult<()> {
        *lock(&self.config.auth_call_count) += 1;

        if self.config.auth_succeeds {
            self.authenticated = true;
            Ok(())
        } else {
            let error_msg = self
                .config
                .auth_error
                .clone()
                .unwrap_or_else(|| "Mock authentication failed".to_string());
            Err(PlatformError::Authentication(error_msg))
        }
    }

    async fn upload_attachment(&self, media: &MediaFile) -> PlatformResult<MediaHandle> {
        *lock(&self.config.upload_call_count) += 1;

        if !self.authenticated {
            return Err(PlatformError::Authentication(
                "Not authenticated".to_string(),
            ));
        }

        if self.config.upload_succeeds {
            let mut uploaded = lock(&self.config.uploaded_files);
            uploaded.push(media.path.clone());
            Ok(MediaHandle::Id(format!(
                "{}-media-{}",
                self.config.name,
                uploaded.len()
            )))
        } else {
            let error_msg = self
                .config
                .upload_error
                .clone()
                .unwrap_or_else(|| "Mock upload failed".to_string());
            Err(PlatformError::Upload(error_msg))
        }
    }

    async fn post(&self, content: &str, media: &[MediaHandle]) -> PlatformResult<String> {
        *lock(&self.config.post_call_count) += 1;

        if !self.authenticated {
            return Err(PlatformError::Authentication(
                "Not authenticated".to_string(),
            ));
        }

        if self.config.post_succeeds {
            lock(&self.config.posted_content).push(content.to_string());
            lock(&self.config.posted_media).push(media.to_vec());

            let post_id = format!("{}:mock-{}", self.config.name, uuid::Uuid::new_v4());
            Ok(post_id)
        } else {
            let error_msg = self
                .config
                .post_error
                .clone()
                .unwrap_or_else(|| "Mock posting failed".to_string());
            Err(PlatformError::Posting(error_msg))
        }
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }

    fn max_attachments(&self) -> usize {
        self.config.max_attachments
    }
}

/// In-memory stand-in for a Bluesky PDS
///
/// Logins succeed unless outcomes were queued with
/// [`MockAtprotoApi::with_login_failures`] or
/// [`MockAtprotoApi::with_login_error`]. Created records are kept for
/// inspection.
#[derive(Default)]
pub struct MockAtprotoApi {
    login_outcomes: Mutex<VecDeque<PlatformError>>,
    handles: HashMap<String, String>,
    login_attempts: Arc<Mutex<usize>>,
    records: Arc<Mutex<Vec<Value>>>,
    blob_count: Mutex<usize>,
}

impl MockAtprotoApi {
    pub const DID: &'static str = "did:plc:mock";

    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` logins as bad passwords
    pub fn with_login_failures(self, count: usize) -> Self {
        for _ in 0..count {
            lock(&self.login_outcomes).push_back(PlatformError::Authentication(
                "Bluesky login returned HTTP 401: AuthenticationRequired: Invalid identifier or password"
                    .to_string(),
            ));
        }
        self
    }

    /// Fail the next login with `error`
    pub fn with_login_error(self, error: PlatformError) -> Self {
        lock(&self.login_outcomes).push_back(error);
        self
    }

    /// Make `handle` resolve to `did`
    pub fn with_handle(mut self, handle: &str, did: &str) -> Self {
        self.handles.insert(handle.to_string(), did.to_string());
        self
    }

    /// Shared count of createSession calls
    pub fn login_attempts(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.login_attempts)
    }

    /// Shared list of created post records
    pub fn records(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.records)
    }
}

#[async_trait]
impl AtprotoApi for MockAtprotoApi {
    async fn create_session(
        &self,
        identifier: &str,
        _password: &SecretString,
    ) -> PlatformResult<Session> {
        *lock(&self.login_attempts) += 1;

        match lock(&self.login_outcomes).pop_front() {
            Some(error) => Err(error),
            None => Ok(Session::new(Self::DID, identifier, "mock-access-jwt")),
        }
    }

    async fn upload_blob(
        &self,
        _session: &Session,
        bytes: Vec<u8>,
        mime: &str,
    ) -> PlatformResult<Value> {
        let mut count = lock(&self.blob_count);
        *count += 1;

        Ok(json!({
            "$type": "blob",
            "ref": { "$link": format!("bafkmock{}", count) },
            "mimeType": mime,
            "size": bytes.len(),
        }))
    }

    async fn create_record(&self, session: &Session, record: Value) -> PlatformResult<String> {
        let mut records = lock(&self.records);
        records.push(record);
        Ok(format!(
            "at://{}/{}/{}",
            session.did,
            POST_COLLECTION,
            records.len()
        ))
    }

    async fn resolve_handle(&self, handle: &str) -> PlatformResult<String> {
        self.handles
            .get(handle)
            .cloned()
            .ok_or_else(|| PlatformError::Resolution(format!("Unable to resolve handle: {}", handle)))
    }
}

//! Handle to account identifier resolution

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::PlatformError;

/// Normalize a handle for lookup: strip a leading `@`, trim, lowercase.
///
/// Returns `None` when nothing usable is left.
pub fn normalize_handle(handle: &str) -> Option<String> {
    let normalized = handle.trim().trim_start_matches('@').trim().to_lowercase();
    if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
        None
    } else {
        Some(normalized)
    }
}

/// Resolves a social handle to a stable account identifier (a DID on Bluesky).
#[async_trait]
pub trait HandleResolver: Send + Sync {
    /// Look up an already-normalized handle.
    async fn lookup(&self, handle: &str) -> Result<String, PlatformError>;

    /// Resolve a raw handle, e.g. `@Alice.bsky.social`.
    ///
    /// Never fails: any problem yields `None` and the caller keeps the
    /// mention as plain text.
    async fn resolve(&self, handle: &str) -> Option<String> {
        let Some(normalized) = normalize_handle(handle) else {
            tracing::debug!("Skipping resolution of malformed handle {:?}", handle);
            return None;
        };

        match self.lookup(&normalized).await {
            Ok(account_id) => {
                tracing::debug!("Resolved {} to {}", normalized, account_id);
                Some(account_id)
            }
            Err(e) => {
                tracing::debug!("Could not resolve {}: {}", normalized, e);
                None
            }
        }
    }
}

/// Fixed handle table, keyed by normalized handle
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handle: &str, account_id: &str) -> Self {
        if let Some(normalized) = normalize_handle(handle) {
            self.entries.insert(normalized, account_id.to_string());
        }
        self
    }
}

#[async_trait]
impl HandleResolver for StaticResolver {
    async fn lookup(&self, handle: &str) -> Result<String, PlatformError> {
        self.entries
            .get(handle)
            .cloned()
            .ok_or_else(|| PlatformError::Resolution(format!("Unknown handle: {}", handle)))
    }
}

//! Configuration management for Crosspost
//!
//! Credentials come from an optional TOML file and from the process
//! environment (a `.env` file in the working directory is loaded first).
//! Environment values win over file values field by field. The result is a
//! plain [`Config`] value that is handed to each platform client; nothing
//! reads the environment after startup.
//!
//! | Variable | Field |
//! |---|---|
//! | `MASTODON_BASE_URL` | `mastodon.base_url` |
//! | `MASTODON_ACCESS_TOKEN` | `mastodon.access_token` |
//! | `TWITTER_API_KEY` | `twitter.api_key` |
//! | `TWITTER_API_SECRET` | `twitter.api_secret` |
//! | `TWITTER_ACCESS_TOKEN` | `twitter.access_token` |
//! | `TWITTER_ACCESS_TOKEN_SECRET` | `twitter.access_token_secret` |
//! | `TWITTER_BEARER_TOKEN` | `twitter.bearer_token` |
//! | `BLUESKY_HANDLE` | `bluesky.handle` |
//! | `BLUESKY_PDS_URL` | `bluesky.pds_url` |
//!
//! The Bluesky password is never part of the configuration; it is asked for
//! at login time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{ConfigError, PlatformError, Result};
use crate::types::PlatformKind;

pub const DEFAULT_BLUESKY_PDS: &str = "https://bsky.social";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub mastodon: Option<MastodonConfig>,
    #[serde(default)]
    pub twitter: Option<TwitterConfig>,
    #[serde(default)]
    pub bluesky: Option<BlueskyConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MastodonConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TwitterConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_secret: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlueskyConfig {
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub pds_url: Option<String>,
}

impl MastodonConfig {
    /// Instance URL with an `https://` scheme added when missing
    pub fn instance_url(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            base.to_string()
        } else {
            format!("https://{}", base)
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.trim().is_empty() {
            missing.push("MASTODON_BASE_URL");
        }
        if self.access_token.trim().is_empty() {
            missing.push("MASTODON_ACCESS_TOKEN");
        }
        missing
    }
}

impl TwitterConfig {
    fn missing_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("TWITTER_API_KEY", &self.api_key),
            ("TWITTER_API_SECRET", &self.api_secret),
            ("TWITTER_ACCESS_TOKEN", &self.access_token),
            ("TWITTER_ACCESS_TOKEN_SECRET", &self.access_token_secret),
        ];
        fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BlueskyConfig {
    /// Handle without a leading `@`
    pub fn normalized_handle(&self) -> String {
        self.handle.trim().trim_start_matches('@').to_string()
    }

    pub fn pds_url(&self) -> String {
        self.pds_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BLUESKY_PDS)
            .trim_end_matches('/')
            .to_string()
    }
}

/// The error worth reporting from loading a `.env` file; having none is fine.
fn dotenv_problem<T>(result: dotenvy::Result<T>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}

fn incomplete(platform: PlatformKind, missing: &[&str]) -> PlatformError {
    PlatformError::Authentication(format!(
        "{} is not configured: missing {}",
        platform.display_name(),
        missing.join(", ")
    ))
}

impl Config {
    /// Load configuration from the default file location (if any) and the
    /// process environment.
    pub fn load() -> Result<Self> {
        if let Some(e) = dotenv_problem(dotenvy::dotenv()) {
            warn!("Ignoring .env file: {}", e);
        }

        let mut config = match resolve_config_path()? {
            Some(path) => Self::load_from_path(&path)?,
            None => Config::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Build a configuration from a key lookup alone
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_overrides(lookup);
        config
    }

    /// Overlay values from `lookup` onto this configuration. Blank values are
    /// ignored; a section is created as soon as one of its keys is set.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("MASTODON_BASE_URL") {
            self.mastodon.get_or_insert_with(Default::default).base_url = value;
        }
        if let Some(value) = get("MASTODON_ACCESS_TOKEN") {
            self.mastodon.get_or_insert_with(Default::default).access_token = value;
        }

        if let Some(value) = get("TWITTER_API_KEY") {
            self.twitter.get_or_insert_with(Default::default).api_key = value;
        }
        if let Some(value) = get("TWITTER_API_SECRET") {
            self.twitter.get_or_insert_with(Default::default).api_secret = value;
        }
        if let Some(value) = get("TWITTER_ACCESS_TOKEN") {
            self.twitter.get_or_insert_with(Default::default).access_token = value;
        }
        if let Some(value) = get("TWITTER_ACCESS_TOKEN_SECRET") {
            self.twitter
                .get_or_insert_with(Default::default)
                .access_token_secret = value;
        }
        if let Some(value) = get("TWITTER_BEARER_TOKEN") {
            self.twitter.get_or_insert_with(Default::default).bearer_token = Some(value);
        }

        if let Some(value) = get("BLUESKY_HANDLE") {
            self.bluesky.get_or_insert_with(Default::default).handle = value;
        }
        if let Some(value) = get("BLUESKY_PDS_URL") {
            self.bluesky.get_or_insert_with(Default::default).pds_url = Some(value);
        }
    }

    /// Mastodon settings, or an authentication error naming what is missing
    pub fn mastodon(&self) -> std::result::Result<&MastodonConfig, PlatformError> {
        let config = self
            .mastodon
            .as_ref()
            .ok_or_else(|| incomplete(PlatformKind::Mastodon, &["MASTODON_BASE_URL", "MASTODON_ACCESS_TOKEN"]))?;
        let missing = config.missing_fields();
        if missing.is_empty() {
            Ok(config)
        } else {
            Err(incomplete(PlatformKind::Mastodon, &missing))
        }
    }

    /// Twitter settings, or an authentication error naming what is missing
    pub fn twitter(&self) -> std::result::Result<&TwitterConfig, PlatformError> {
        let config = self.twitter.as_ref().ok_or_else(|| {
            incomplete(
                PlatformKind::Twitter,
                &TwitterConfig::default().missing_fields(),
            )
        })?;
        let missing = config.missing_fields();
        if missing.is_empty() {
            Ok(config)
        } else {
            Err(incomplete(PlatformKind::Twitter, &missing))
        }
    }

    /// Bluesky settings, or an authentication error when no handle is set
    pub fn bluesky(&self) -> std::result::Result<&BlueskyConfig, PlatformError> {
        match &self.bluesky {
            Some(config) if !config.normalized_handle().is_empty() => Ok(config),
            _ => Err(incomplete(PlatformKind::Bluesky, &["BLUESKY_HANDLE"])),
        }
    }
}

/// Resolve the configuration file path.
///
/// `CROSSPOST_CONFIG` always wins (and must exist); otherwise the XDG config
/// location is used only when the file is present.
pub fn resolve_config_path() -> Result<Option<PathBuf>> {
    if let Ok(path) = std::env::var("CROSSPOST_CONFIG") {
        return Ok(Some(PathBuf::from(shellexpand::tilde(&path).to_string())));
    }

    let default_path = dirs::config_dir().map(|dir| dir.join("crosspost").join("config.toml"));
    Ok(default_path.filter(|path| path.exists()))
}

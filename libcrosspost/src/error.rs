//! Error types for Crosspost

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrosspostError>;

#[derive(Error, Debug)]
pub enum CrosspostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CrosspostError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrosspostError::InvalidInput(_) => 3,
            CrosspostError::Platform(PlatformError::Authentication(_)) => 2,
            CrosspostError::Platform(_) => 1,
            CrosspostError::Config(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Handle resolution failed: {0}")]
    Resolution(String),
}

impl PlatformError {
    /// Map an HTTP status returned by a platform API to an error variant.
    ///
    /// `platform` and `context` end up in the message so a failure printed at
    /// the publisher boundary says where it came from.
    pub fn from_status(platform: &str, context: &str, status: u16, body: &str) -> Self {
        let detail = if body.trim().is_empty() {
            format!("{} {} returned HTTP {}", platform, context, status)
        } else {
            format!(
                "{} {} returned HTTP {}: {}",
                platform,
                context,
                status,
                body.trim()
            )
        };

        match status {
            401 | 403 => PlatformError::Authentication(detail),
            400 | 413 | 415 | 422 => PlatformError::Validation(detail),
            429 => PlatformError::RateLimit(detail),
            500..=599 => PlatformError::Network(detail),
            _ => PlatformError::Posting(detail),
        }
    }

    /// Whether this error was an authorization rejection.
    pub fn is_authentication(&self) -> bool {
        matches!(self, PlatformError::Authentication(_))
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => {
                PlatformError::from_status("HTTP", "request", status.as_u16(), &error.to_string())
            }
            None if error.is_timeout() || error.is_connect() || error.is_request() => {
                PlatformError::Network(error.to_string())
            }
            None => PlatformError::Posting(error.to_string()),
        }
    }
}

impl From<reqwest::Error> for CrosspostError {
    fn from(error: reqwest::Error) -> Self {
        CrosspostError::Platform(error.into())
    }
}

//! Secret input for interactive logins
//!
//! Platform clients never prompt on their own; they ask a [`SecretProvider`].
//! The CLI hands them a [`PromptSecret`] that reads from the terminal without
//! echo, tests hand them a [`StaticSecret`] or [`SecretSequence`].

use secrecy::SecretString;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::PlatformError;

pub trait SecretProvider: Send {
    /// Produce the next secret, showing `prompt` if input is interactive.
    fn secret(&mut self, prompt: &str) -> Result<SecretString, PlatformError>;
}

/// Reads a secret from the terminal without echo
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptSecret;

impl SecretProvider for PromptSecret {
    fn secret(&mut self, prompt: &str) -> Result<SecretString, PlatformError> {
        if !atty::is(atty::Stream::Stdin) {
            return Err(PlatformError::Authentication(
                "Cannot prompt for a password: no TTY available".to_string(),
            ));
        }

        // An empty entry is passed on; the caller decides whether to ask again
        let password = rpassword::prompt_password(prompt).map_err(|e| {
            PlatformError::Authentication(format!("Failed to read password: {}", e))
        })?;

        Ok(SecretString::from(password))
    }
}

/// Returns the same pre-supplied secret every time
pub struct StaticSecret {
    value: String,
}

impl StaticSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl SecretProvider for StaticSecret {
    fn secret(&mut self, _prompt: &str) -> Result<SecretString, PlatformError> {
        Ok(SecretString::from(self.value.clone()))
    }
}

/// Hands out queued secrets in order and counts prompts
///
/// The prompt counter is shared so a test can keep a handle to it after the
/// provider has been moved into a client.
pub struct SecretSequence {
    secrets: VecDeque<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl SecretSequence {
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            secrets: secrets.into_iter().map(Into::into).collect(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared log of the prompts shown so far
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

impl SecretProvider for SecretSequence {
    fn secret(&mut self, prompt: &str) -> Result<SecretString, PlatformError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        self.secrets
            .pop_front()
            .map(SecretString::from)
            .ok_or_else(|| PlatformError::Authentication("No more secrets available".to_string()))
    }
}

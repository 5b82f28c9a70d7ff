//! Mailtrap client configuration

use std::time::Duration;

use crate::error::{E2eError, E2eResult};

/// Environment variable holding the Mailtrap API token
pub const API_TOKEN_VAR: &str = "MAILTRAP_API_TOKEN";

/// Environment variable holding the Mailtrap inbox id
pub const INBOX_ID_VAR: &str = "MAILTRAP_INBOX_ID";

/// Environment variable overriding the Mailtrap base URL
pub const BASE_URL_VAR: &str = "MAILTRAP_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://mailtrap.io";

/// Credentials and location of the inbox the application under test mails into.
///
/// Built once and handed to [`MailtrapClient::new`](crate::mailtrap::MailtrapClient::new);
/// the client never looks at the process environment itself.
#[derive(Debug, Clone)]
pub struct MailtrapConfig {
    /// API root, e.g. `https://mailtrap.io`
    pub base_url: String,

    /// Sent as the `Api-Token` header
    pub api_token: String,

    /// Inbox to list messages from
    pub inbox_id: String,

    /// Per-request timeout applied by the HTTP client
    pub request_timeout: Duration,
}

impl Default for MailtrapConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: String::new(),
            inbox_id: String::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl MailtrapConfig {
    pub fn new(api_token: impl Into<String>, inbox_id: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            inbox_id: inbox_id.into(),
            ..Default::default()
        }
    }

    /// Read `MAILTRAP_API_TOKEN`, `MAILTRAP_INBOX_ID` and the optional
    /// `MAILTRAP_BASE_URL` from the process environment.
    pub fn from_env() -> E2eResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup(API_TOKEN_VAR)
            .ok_or_else(|| E2eError::Config(format!("{} is not set", API_TOKEN_VAR)))?;
        let inbox_id = lookup(INBOX_ID_VAR)
            .ok_or_else(|| E2eError::Config(format!("{} is not set", INBOX_ID_VAR)))?;

        let mut config = Self::new(api_token, inbox_id);
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            config.base_url = base_url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.api_token.trim().is_empty() {
            return Err(E2eError::Config("Mailtrap API token is empty".to_string()));
        }
        if self.inbox_id.trim().is_empty() {
            return Err(E2eError::Config("Mailtrap inbox id is empty".to_string()));
        }
        url::Url::parse(&self.base_url)?;
        Ok(())
    }
}

//! Mailtrap inbox checks
//!
//! Answers "does one of the most recent inbox messages mention this text?"
//! against a Mailtrap testing inbox. Failures from the API (transport, auth,
//! decoding) are returned to the caller untouched; an empty inbox is simply
//! a negative answer.

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::MailtrapConfig;
use crate::error::E2eResult;

/// How many of the newest messages the `any_*_contains` checks look at
pub const DEFAULT_MESSAGE_COUNT: usize = 5;

const API_TOKEN_HEADER: &str = "Api-Token";

/// Message summary as returned by the inbox listing
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<u64>,

    pub subject: String,

    /// Path (or absolute URL) of the rendered HTML body
    pub html_path: String,

    #[serde(default)]
    pub to_email: Option<String>,

    #[serde(default)]
    pub sent_at: Option<String>,
}

/// Authenticated client for one Mailtrap inbox
pub struct MailtrapClient {
    http: reqwest::Client,
    base_url: Url,
    api_token: String,
    inbox_id: String,
}

impl MailtrapClient {
    pub fn new(config: MailtrapConfig) -> E2eResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(&config.base_url)?,
            api_token: config.api_token,
            inbox_id: config.inbox_id,
        })
    }

    /// Resolve an API path below the base URL, keeping any path prefix the
    /// base carries. Absolute URLs are used as they are.
    fn endpoint(&self, path: &str) -> E2eResult<Url> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))?)
    }

    /// Fetch up to `count` of the newest messages, in the order Mailtrap
    /// lists them (most recent first).
    pub async fn latest_messages(&self, count: usize) -> E2eResult<Vec<Message>> {
        let path = format!(
            "/api/v1/inboxes/{}/messages?search=&page=&last_id=",
            self.inbox_id
        );
        let url = self.endpoint(&path)?;

        debug!("Listing Mailtrap inbox {}", self.inbox_id);

        let mut messages: Vec<Message> = self
            .http
            .get(url)
            .header(API_TOKEN_HEADER, &self.api_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        messages.truncate(count);
        debug!("Inbox {} returned {} message(s)", self.inbox_id, messages.len());
        Ok(messages)
    }

    pub async fn latest_default(&self) -> E2eResult<Vec<Message>> {
        self.latest_messages(DEFAULT_MESSAGE_COUNT).await
    }

    /// Download the rendered HTML body of a message
    pub async fn message_body(&self, message: &Message) -> E2eResult<String> {
        let url = self.endpoint(&message.html_path)?;

        let body = self
            .http
            .get(url)
            .header(API_TOKEN_HEADER, &self.api_token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(body)
    }

    /// Whether one of the latest messages has `search_text` in its subject.
    ///
    /// Case-sensitive substring match. Be sure to act on the returned value;
    /// a `false` does not fail anything by itself.
    pub async fn any_subject_contains(&self, search_text: &str) -> E2eResult<bool> {
        let messages = self.latest_default().await?;

        let found = messages.iter().any(|m| m.subject.contains(search_text));
        info!("Subject search for {:?}: found={}", search_text, found);
        Ok(found)
    }

    /// Whether one of the latest messages has `search_text` anywhere in its
    /// HTML body.
    ///
    /// Bodies are not part of the listing, so each candidate costs one more
    /// request. Requests are issued one at a time and the scan stops at the
    /// first hit.
    pub async fn any_body_contains(&self, search_text: &str) -> E2eResult<bool> {
        let messages = self.latest_default().await?;

        for message in &messages {
            let body = self.message_body(message).await?;
            if body.contains(search_text) {
                info!("Body search for {:?}: matched {:?}", search_text, message.subject);
                return Ok(true);
            }
        }

        info!("Body search for {:?}: no match in {} message(s)", search_text, messages.len());
        Ok(false)
    }
}

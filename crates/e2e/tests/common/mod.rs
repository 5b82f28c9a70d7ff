//! Shared fixtures: a recording page driver and an in-process Mailtrap stub
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use donate_e2e::{E2eError, E2eResult, MailtrapClient, MailtrapConfig, PageDriver};

pub const TOKEN: &str = "test-token";
pub const INBOX: &str = "4242";

/// One driver call, in the order it was made
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Navigate(String),
    CheckUrl(String),
    CheckContent(String, String),
    Click(String),
    Input(String, String),
}

/// Fake browser: a current URL, the text of some elements, and a call log
#[derive(Default)]
pub struct RecordingDriver {
    url: Mutex<String>,
    texts: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingDriver {
    pub fn at(url: &str) -> Self {
        let driver = Self::default();
        *driver.url.lock().unwrap() = url.to_string();
        driver
    }

    pub fn with_text(self, selector: &str, text: &str) -> Self {
        self.texts
            .lock()
            .unwrap()
            .insert(selector.to_string(), text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PageDriver for RecordingDriver {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        self.record(Call::Navigate(url.to_string()));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn check_url(&self, fragment: &str) -> E2eResult<()> {
        self.record(Call::CheckUrl(fragment.to_string()));
        let url = self.url.lock().unwrap().clone();
        if url.contains(fragment) {
            Ok(())
        } else {
            Err(E2eError::AssertionFailed(format!(
                "expected URL containing '{}', got '{}'",
                fragment, url
            )))
        }
    }

    async fn check_selector_content(&self, selector: &str, expected: &str) -> E2eResult<()> {
        self.record(Call::CheckContent(selector.to_string(), expected.to_string()));
        let actual = self.texts.lock().unwrap().get(selector).cloned();
        match actual {
            Some(text) if text == expected => Ok(()),
            other => Err(E2eError::AssertionFailed(format!(
                "expected '{}' to read '{}', found {:?}",
                selector, expected, other
            ))),
        }
    }

    async fn click_selector(&self, selector: &str) -> E2eResult<()> {
        self.record(Call::Click(selector.to_string()));
        Ok(())
    }

    async fn input_selector_value(&self, selector: &str, value: &str) -> E2eResult<()> {
        self.record(Call::Input(selector.to_string(), value.to_string()));
        Ok(())
    }
}

struct InboxState {
    messages: Vec<(String, String)>,
    list_requests: AtomicUsize,
    body_requests: AtomicUsize,
    last_query: Mutex<Option<String>>,
}

/// Mailtrap API stub serving a fixed inbox, newest message first
pub struct StubInbox {
    pub base_url: String,
    state: Arc<InboxState>,
}

impl StubInbox {
    /// `messages` are `(subject, html body)` pairs, newest first
    pub async fn spawn(messages: &[(&str, &str)]) -> Self {
        Self::spawn_under("", messages).await
    }

    /// Serve the API below a path prefix such as `/proxy`
    pub async fn spawn_under(prefix: &str, messages: &[(&str, &str)]) -> Self {
        let state = Arc::new(InboxState {
            messages: messages
                .iter()
                .map(|(s, b)| (s.to_string(), b.to_string()))
                .collect(),
            list_requests: AtomicUsize::new(0),
            body_requests: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        });

        let api = Router::new()
            .route("/api/v1/inboxes/:inbox_id/messages", get(list_messages))
            .route("/api/v1/inboxes/:inbox_id/messages/:id/body.html", get(message_body))
            .with_state(state.clone());
        let app = if prefix.is_empty() {
            api
        } else {
            Router::new().nest(prefix, api)
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}{}", addr, prefix),
            state,
        }
    }

    pub fn client(&self) -> MailtrapClient {
        self.client_with_token(TOKEN)
    }

    pub fn client_with_token(&self, token: &str) -> MailtrapClient {
        MailtrapClient::new(MailtrapConfig {
            base_url: self.base_url.clone(),
            ..MailtrapConfig::new(token, INBOX)
        })
        .unwrap()
    }

    pub fn list_requests(&self) -> usize {
        self.state.list_requests.load(Ordering::SeqCst)
    }

    pub fn body_requests(&self) -> usize {
        self.state.body_requests.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.state.last_query.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("Api-Token")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == TOKEN)
        .unwrap_or(false)
}

async fn list_messages(
    State(state): State<Arc<InboxState>>,
    Path(inbox_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state.list_requests.fetch_add(1, Ordering::SeqCst);
    *state.last_query.lock().unwrap() = query;

    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if inbox_id != INBOX {
        return Err(StatusCode::NOT_FOUND);
    }

    let listing: Vec<serde_json::Value> = state
        .messages
        .iter()
        .enumerate()
        .map(|(i, (subject, _))| {
            json!({
                "id": i + 1,
                "subject": subject,
                "html_path": format!("/api/v1/inboxes/{}/messages/{}/body.html", INBOX, i + 1),
                "to_email": "donor@example.com",
                "is_read": false,
            })
        })
        .collect();

    Ok(Json(serde_json::Value::Array(listing)))
}

async fn message_body(
    State(state): State<Arc<InboxState>>,
    Path((_inbox_id, id)): Path<(String, usize)>,
    headers: HeaderMap,
) -> Result<Html<String>, StatusCode> {
    state.body_requests.fetch_add(1, Ordering::SeqCst);

    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    id.checked_sub(1)
        .and_then(|i| state.messages.get(i))
        .map(|(_, body)| Html(body.clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

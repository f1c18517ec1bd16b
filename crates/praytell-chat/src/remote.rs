//! HTTP client for a running chat server
//!
//! Lets a [`ConversationManager`](crate::ConversationManager) drive a remote
//! server instead of in-process services.

use crate::conversation::{ChatBackend, TurnPersister};
use crate::orchestrator::{ChatReply, ChatRequest};
use crate::persistence::{SaveRequest, SavedMessage};
use async_trait::async_trait;
use praytell_core::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct SimilarBody {
    similar: Vec<String>,
}

pub struct HttpChatClient {
    client: Client,
    base_url: String,
}

impl HttpChatClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bodies of the stored messages closest to `message`
    pub async fn similar(&self, message: &str) -> Result<Vec<String>> {
        let (status, body) = self
            .post("similar-messages", &json!({ "message": message }))
            .await
            .map_err(|e| Error::Retrieval(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Retrieval(error_message(status, &body)));
        }
        Ok(decode::<SimilarBody>(&body)?.similar)
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> std::result::Result<(StatusCode, String), reqwest::Error> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.post(&url).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn dispatch(&self, request: ChatRequest) -> Result<ChatReply> {
        let (status, body) = self
            .post("chat", &request)
            .await
            .map_err(|e| Error::completion(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::completion_status(
                status.as_u16(),
                error_message(status, &body),
            ));
        }
        decode(&body)
    }
}

#[async_trait]
impl TurnPersister for HttpChatClient {
    async fn persist(&self, request: SaveRequest) -> Result<SavedMessage> {
        let (status, body) = self
            .post("save-message", &request)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?;
        match status {
            s if s.is_success() => decode(&body),
            StatusCode::BAD_REQUEST => Err(Error::validation(error_message(status, &body))),
            _ => Err(Error::Persistence(error_message(status, &body))),
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(body)?)
}

/// The server's `{error}` text, else the status line
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| format!("HTTP {status}"))
}

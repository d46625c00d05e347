//! Outbound HTTP for provider calls.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A fully built provider call.
///
/// Headers carry the caller's credential; `Debug` prints header names only.
pub struct ChatRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

impl fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(name, _)| *name).collect();
        f.debug_struct("ChatRequest")
            .field("url", &self.url)
            .field("headers", &names)
            .finish_non_exhaustive()
    }
}

/// Raw upstream reply: status code and body text
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub status: u16,
    pub body: String,
}

impl ChatResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failure, including timeouts
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError("request timed out".to_string())
        } else {
            // without_url keeps query strings out of the message
            TransportError(e.without_url().to_string())
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post(&self, request: ChatRequest) -> Result<ChatResponse, TransportError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post(&self, request: ChatRequest) -> Result<ChatResponse, TransportError> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ChatResponse { status, body })
    }
}

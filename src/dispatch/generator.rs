//! Response generation collaborators

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Why a reply could not be produced
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("response generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("response generation request failed: {0}")]
    Request(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no response generator is configured")]
    Unconfigured,
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Turns a recognized command into reply text
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, command: &str) -> Result<String, GenerationError>;
}

/// Generator backed by a JSON HTTP endpoint
///
/// Sends `{"prompt": "<command>"}` and expects `{"reply": "<text>"}`.
pub struct HttpGenerator {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    reply: String,
}

impl HttpGenerator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ResponseGenerator for HttpGenerator {
    async fn generate(&self, command: &str) -> Result<String, GenerationError> {
        debug!(url = %self.url, "requesting reply");

        let response = self
            .client
            .post(&self.url)
            .json(&GenerateRequest { prompt: command })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request(format!("{status}: {body}")));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.reply)
    }
}

/// Stand-in used when no generator endpoint is configured
pub struct UnconfiguredGenerator;

#[async_trait]
impl ResponseGenerator for UnconfiguredGenerator {
    async fn generate(&self, _command: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Unconfigured)
    }
}

//! Local (on-device) inference facility.
//!
//! The facility is injected into the orchestrator as a trait object so the
//! host can supply whatever runtime it has. [`OllamaInference`] talks to a
//! local Ollama daemon over its HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LocalConfig;
use crate::error::LocalInferenceError;

/// Answer of the facility's readiness query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAvailability {
    Readily,
    AfterDownload,
    No,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub system_prompt: String,
    pub temperature: f64,
    pub top_k: u32,
}

/// A single-shot text session
#[async_trait]
pub trait LocalSession: Send + Sync {
    /// Submit one prompt and wait for the full output.
    async fn prompt(&self, text: &str) -> Result<String, LocalInferenceError>;
}

#[async_trait]
pub trait LocalInference: Send + Sync {
    async fn can_create_session(&self) -> Result<SessionAvailability, LocalInferenceError>;

    async fn create_session(
        &self,
        options: SessionOptions,
    ) -> Result<Box<dyn LocalSession>, LocalInferenceError>;
}

/// Local inference backed by an Ollama daemon
pub struct OllamaInference {
    base_url: String,
    model: String,
    allow_download: bool,
    client: reqwest::Client,
}

impl OllamaInference {
    pub fn new(config: &LocalConfig) -> Result<Self, LocalInferenceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                LocalInferenceError::Unreachable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            allow_download: config.allow_download,
            client,
        })
    }

    fn has_model(&self, tags: &OllamaTags) -> bool {
        let tagged = format!("{}:latest", self.model);
        tags.models
            .iter()
            .any(|m| m.name == self.model || m.name == tagged)
    }
}

#[async_trait]
impl LocalInference for OllamaInference {
    async fn can_create_session(&self) -> Result<SessionAvailability, LocalInferenceError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| LocalInferenceError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocalInferenceError::Unreachable(format!(
                "tag listing returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let tags: OllamaTags = response
            .json()
            .await
            .map_err(|e| LocalInferenceError::Unreachable(format!("bad tag listing: {}", e)))?;

        let availability = if self.has_model(&tags) {
            SessionAvailability::Readily
        } else if self.allow_download {
            SessionAvailability::AfterDownload
        } else {
            SessionAvailability::No
        };
        debug!(model = %self.model, ?availability, "Local inference readiness");
        Ok(availability)
    }

    async fn create_session(
        &self,
        options: SessionOptions,
    ) -> Result<Box<dyn LocalSession>, LocalInferenceError> {
        Ok(Box::new(OllamaSession {
            url: format!("{}/api/generate", self.base_url),
            model: self.model.clone(),
            options,
            client: self.client.clone(),
        }))
    }
}

struct OllamaSession {
    url: String,
    model: String,
    options: SessionOptions,
    client: reqwest::Client,
}

#[async_trait]
impl LocalSession for OllamaSession {
    async fn prompt(&self, text: &str) -> Result<String, LocalInferenceError> {
        let body = OllamaGenerateRequest {
            model: &self.model,
            system: &self.options.system_prompt,
            prompt: text,
            stream: false,
            options: OllamaOptions {
                temperature: self.options.temperature,
                top_k: self.options.top_k,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LocalInferenceError::Session(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(LocalInferenceError::Session(format!(
                "HTTP {}: {}",
                status.as_u16(),
                raw
            )));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| LocalInferenceError::Session(format!("bad response: {}", e)))?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(LocalInferenceError::EmptyOutput);
        }
        Ok(text.to_string())
    }
}

// Ollama API types
#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    top_k: u32,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

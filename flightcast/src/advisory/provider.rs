//! Remote generation provider abstraction.
//!
//! A provider answers one prompt for one [`Candidate`]. It does not decide
//! what to do on failure; it only reports the failure with enough detail
//! (HTTP status, transport vs. body problem) for the cascade to classify it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::candidates::Candidate;
use crate::config::RemoteConfig;
use crate::error::ProviderError;
use crate::utils::log_redaction::redact_secret;

const ERROR_BODY_PREVIEW: usize = 500;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Scheme prefix of the provider tags this provider produces.
    fn scheme(&self) -> &str;

    /// Issue one generation call for `candidate`.
    async fn generate(&self, candidate: &Candidate, prompt: &str) -> Result<String, ProviderError>;
}

/// Google Gemini `generateContent` provider
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub const SCHEME: &'static str = "gemini";

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Setup(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Build a provider from the remote config, or `None` when no credential
    /// is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, ProviderError> {
        match config.credential() {
            Some(key) => Self::new(
                key,
                config.base_url.clone(),
                Duration::from_secs(config.candidate_timeout_seconds),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    fn endpoint(&self, candidate: &Candidate) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, candidate.version, candidate.model
        )
    }

    fn describe_failure(&self, raw_body: &str) -> String {
        let message = serde_json::from_str::<GeminiErrorEnvelope>(raw_body)
            .ok()
            .map(|envelope| envelope.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| preview(raw_body));
        redact_secret(&message, &self.api_key)
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    async fn generate(&self, candidate: &Candidate, prompt: &str) -> Result<String, ProviderError> {
        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint(candidate))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(redact_secret(&e.to_string(), &self.api_key)))?;

        let status = response.status();
        let raw_body = response
            .text()
            .await
            .map_err(|e| body_read_failure(status.as_u16(), &e.to_string()))?;
        debug!(
            %candidate,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Gemini call finished"
        );

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: self.describe_failure(&raw_body),
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&raw_body)
            .map_err(|e| ProviderError::EmptyResponse(format!("Failed to parse response: {}", e)))?;

        extract_text(&parsed)
            .ok_or_else(|| ProviderError::EmptyResponse(preview(&raw_body)))
    }
}

/// A body that cannot be read keeps the class of the status that arrived.
/// Only a successful or server-class status leaves the failure at transport
/// level.
fn body_read_failure(status: u16, reason: &str) -> ProviderError {
    let message = format!("Failed to read response body: {}", reason);
    if (400..500).contains(&status) {
        ProviderError::Status {
            status,
            body: message,
        }
    } else {
        ProviderError::Transport(message)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &GeminiResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let text = candidate
        .content
        .as_ref()?
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn preview(body: &str) -> String {
    if body.len() > ERROR_BODY_PREVIEW {
        let mut cut = ERROR_BODY_PREVIEW;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated, total length: {} bytes]", &body[..cut], body.len())
    } else {
        body.to_string()
    }
}

// Gemini API types
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> GeminiResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_unreadable_client_error_body_stays_candidate_specific() {
        let err = body_read_failure(404, "connection reset");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_systemic());

        assert!(body_read_failure(503, "connection reset").is_systemic());
        assert!(body_read_failure(200, "connection reset").is_systemic());
    }

    #[test]
    fn test_extract_text_joins_parts_of_first_candidate() {
        let response = parse(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"- Leave early\n"},{"text":"- Check the gate"}]}},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        );
        assert_eq!(
            extract_text(&response).as_deref(),
            Some("- Leave early\n- Check the gate")
        );
    }

    #[test]
    fn test_extract_text_rejects_blocked_or_empty_output() {
        assert_eq!(extract_text(&parse(r#"{"candidates":[]}"#)), None);
        assert_eq!(extract_text(&parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)), None);
        assert_eq!(
            extract_text(&parse(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#)),
            None
        );
    }

    #[test]
    fn test_endpoint_layout() {
        let provider =
            GeminiProvider::new("k", "https://example.test/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            provider.endpoint(&Candidate::new("v1beta", "gemini-1.5-flash")),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_failure_description_prefers_error_message_and_redacts_key() {
        let provider =
            GeminiProvider::new("sekret-key", "https://example.test", Duration::from_secs(1)).unwrap();
        let described = provider.describe_failure(
            r#"{"error":{"code":404,"message":"models/foo is not found for key sekret-key"}}"#,
        );
        assert_eq!(described, "models/foo is not found for key [REDACTED]");
        assert_eq!(provider.describe_failure("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_preview_truncates_long_bodies() {
        let body = "é".repeat(400);
        let shown = preview(&body);
        assert!(shown.contains("[truncated, total length: 800 bytes]"));
    }
}

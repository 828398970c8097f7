//! The call that delegates an advisory to the remote side.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::cascade::CascadeResolver;
use super::types::{AdvisoryRequest, AdvisoryResult};
use crate::error::BoundaryError;

/// Route served by the gateway for advisory requests.
pub const ADVISORY_ROUTE: &str = "/api/advisory";

#[async_trait]
pub trait AdvisoryBoundary: Send + Sync {
    /// One delegation per call. Either a full result or a failure, never a
    /// partial answer.
    async fn request_advisory(
        &self,
        request: &AdvisoryRequest,
    ) -> Result<AdvisoryResult, BoundaryError>;
}

/// Delegates over HTTP to a running gateway
pub struct HttpBoundary {
    url: String,
    client: reqwest::Client,
}

impl HttpBoundary {
    pub fn new(gateway_url: &str, timeout: Duration) -> Result<Self, BoundaryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoundaryError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: format!("{}{}", gateway_url.trim_end_matches('/'), ADVISORY_ROUTE),
            client,
        })
    }
}

#[async_trait]
impl AdvisoryBoundary for HttpBoundary {
    async fn request_advisory(
        &self,
        request: &AdvisoryRequest,
    ) -> Result<AdvisoryResult, BoundaryError> {
        debug!(url = %self.url, mode = %request.mode, "Delegating advisory");
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| BoundaryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BoundaryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: AdvisoryResult = response
            .json()
            .await
            .map_err(|e| BoundaryError::Decode(e.to_string()))?;
        if result.text.trim().is_empty() {
            return Err(BoundaryError::Decode("advisory text was empty".to_string()));
        }
        Ok(result)
    }
}

/// Resolves in the same process, for the CLI and for embedding
pub struct InProcessBoundary {
    resolver: Arc<CascadeResolver>,
}

impl InProcessBoundary {
    pub fn new(resolver: Arc<CascadeResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl AdvisoryBoundary for InProcessBoundary {
    async fn request_advisory(
        &self,
        request: &AdvisoryRequest,
    ) -> Result<AdvisoryResult, BoundaryError> {
        self.resolver
            .resolve(request)
            .await
            .map_err(|e| BoundaryError::Upstream(e.to_string()))
    }
}

//! Remote cascade over (endpoint version, model) candidates.
//!
//! Candidates are tried strictly in list order, one at a time. The first
//! candidate that yields text wins. A server-class failure stops the whole
//! cascade because the provider itself is unhealthy; any other failure only
//! rules out the candidate that was asked. Exhausting the list is not an
//! error: the caller gets the deterministic stub with the last error attached.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::candidates::CandidateList;
use super::prompt;
use super::provider::{GeminiProvider, GenerationProvider};
use super::stub;
use super::types::{AdvisoryRequest, AdvisoryResult};
use crate::config::RemoteConfig;
use crate::error::{CascadeError, ProviderError};
use crate::utils::hash::sha256_hex;

pub struct CascadeResolver {
    provider: Option<Arc<dyn GenerationProvider>>,
    candidates: CandidateList,
}

impl CascadeResolver {
    /// `provider == None` is the zero-configuration demo mode.
    pub fn new(provider: Option<Arc<dyn GenerationProvider>>, candidates: CandidateList) -> Self {
        Self {
            provider,
            candidates,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, ProviderError> {
        let provider = GeminiProvider::from_config(config)?
            .map(|p| Arc::new(p) as Arc<dyn GenerationProvider>);
        let candidates =
            CandidateList::build(config.preferred_model.as_deref(), &config.endpoint_versions);
        Ok(Self::new(provider, candidates))
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub async fn resolve(&self, request: &AdvisoryRequest) -> Result<AdvisoryResult, CascadeError> {
        let Some(provider) = self.provider.as_ref() else {
            info!(mode = %request.mode, "No remote credential configured, answering with stub");
            return Ok(stub::stub_result(request));
        };

        let built = prompt::build_for(request);
        let prompt_hash = sha256_hex(built.as_bytes());
        let mut last_error: Option<ProviderError> = None;

        for (attempt, candidate) in self.candidates.iter().enumerate() {
            debug!(
                %candidate,
                attempt = attempt + 1,
                template = prompt::template_id(request.mode),
                prompt_hash = %prompt_hash,
                "Trying remote candidate"
            );

            let outcome = provider.generate(candidate, &built).await.and_then(|text| {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Err(ProviderError::EmptyResponse(format!(
                        "{} answered with blank text",
                        candidate
                    )))
                } else {
                    Ok(trimmed.to_string())
                }
            });

            match outcome {
                Ok(text) => {
                    let tag = candidate.provider_tag(provider.scheme());
                    info!(provider = %tag, attempts = attempt + 1, "Remote candidate answered");
                    return Ok(AdvisoryResult::new(text, tag));
                }
                Err(e) if e.is_systemic() => {
                    warn!(%candidate, "Provider unhealthy, aborting cascade: {}", e);
                    return Err(CascadeError::Systemic {
                        candidate: candidate.to_string(),
                        attempts: attempt + 1,
                        source: e,
                    });
                }
                Err(e) => {
                    debug!(%candidate, "Candidate rejected: {}", e);
                    last_error = Some(e);
                }
            }
        }

        warn!(
            candidates = self.candidates.len(),
            "Every remote candidate failed, answering with stub"
        );
        Ok(stub::fallback_result(
            request,
            last_error.map(|e| e.to_string()),
        ))
    }
}

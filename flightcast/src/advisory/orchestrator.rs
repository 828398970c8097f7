//! Per-session coordinator for advisory actions.
//!
//! One [`AdvisoryOrchestrator`] lives for the whole dashboard session and is
//! shared by handle. It probes local inference once at construction, then
//! for every action prefers the on-device path and degrades to the remote
//! boundary. Every action settles with a non-empty result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, info_span, warn, Instrument};

use super::boundary::AdvisoryBoundary;
use super::capability;
use super::local::{LocalInference, SessionOptions};
use super::prompt::{self, SESSION_TOP_K, SYSTEM_PROMPT};
use super::stub::UNABLE_TO_GENERATE;
use super::types::{
    AdvisoryRequest, AdvisoryResult, CapabilityStatus, PROVIDER_ERROR, PROVIDER_ON_DEVICE,
};
use crate::error::{BoundaryError, LocalInferenceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryState {
    Idle,
    Generating,
    Settled,
    Failed,
}

struct SessionState {
    phase: AdvisoryState,
    last_result: Option<AdvisoryResult>,
}

pub struct AdvisoryOrchestrator {
    capability: CapabilityStatus,
    local: Option<Arc<dyn LocalInference>>,
    boundary: Arc<dyn AdvisoryBoundary>,
    generating: AtomicBool,
    state: Mutex<SessionState>,
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AdvisoryOrchestrator {
    /// Probe the local facility and build the session coordinator.
    pub async fn initialize(
        local: Option<Arc<dyn LocalInference>>,
        boundary: Arc<dyn AdvisoryBoundary>,
    ) -> Self {
        let capability = capability::probe(local.as_deref()).await;
        Self::with_capability(capability, local, boundary)
    }

    /// Build with an already known capability status.
    pub fn with_capability(
        capability: CapabilityStatus,
        local: Option<Arc<dyn LocalInference>>,
        boundary: Arc<dyn AdvisoryBoundary>,
    ) -> Self {
        Self {
            capability,
            local,
            boundary,
            generating: AtomicBool::new(false),
            state: Mutex::new(SessionState {
                phase: AdvisoryState::Idle,
                last_result: None,
            }),
        }
    }

    pub fn capability(&self) -> CapabilityStatus {
        self.capability
    }

    /// Whether an action is in flight. Front ends disable their triggers
    /// while this is set.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> AdvisoryState {
        self.lock_state().phase
    }

    pub fn last_result(&self) -> Option<AdvisoryResult> {
        self.lock_state().last_result.clone()
    }

    pub fn last_provider(&self) -> Option<String> {
        self.lock_state()
            .last_result
            .as_ref()
            .map(|r| r.provider.clone())
    }

    /// Run one advisory action to completion.
    ///
    /// Never fails: remote unreachability settles as
    /// [`AdvisoryState::Failed`] with a fixed "unable to generate" text and
    /// provider `error`.
    pub async fn generate(&self, request: AdvisoryRequest) -> AdvisoryResult {
        let span = info_span!(
            "advisory",
            action_id = %uuid::Uuid::new_v4(),
            mode = %request.mode,
            capability = %self.capability
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: AdvisoryRequest) -> AdvisoryResult {
        let _in_flight = InFlight::enter(&self.generating);
        self.set_phase(AdvisoryState::Generating);

        if self.capability.allows_on_device() {
            match self.try_on_device(&request).await {
                Ok(text) => {
                    info!("Advisory produced on device");
                    return self.settle(
                        AdvisoryState::Settled,
                        AdvisoryResult::new(text, PROVIDER_ON_DEVICE),
                    );
                }
                Err(e) => warn!("On-device generation failed, using remote path: {}", e),
            }
        }

        let delegated = self
            .boundary
            .request_advisory(&request)
            .await
            .and_then(|result| {
                if result.text.trim().is_empty() {
                    Err(BoundaryError::Decode("advisory text was empty".to_string()))
                } else {
                    Ok(result)
                }
            });

        match delegated {
            Ok(result) => {
                info!(provider = %result.provider, "Advisory produced remotely");
                self.settle(AdvisoryState::Settled, result)
            }
            Err(e) => {
                warn!("Advisory boundary failed: {}", e);
                self.settle(
                    AdvisoryState::Failed,
                    AdvisoryResult::new(UNABLE_TO_GENERATE, PROVIDER_ERROR),
                )
            }
        }
    }

    async fn try_on_device(&self, request: &AdvisoryRequest) -> Result<String, LocalInferenceError> {
        let local = self
            .local
            .as_ref()
            .ok_or_else(|| LocalInferenceError::Unreachable("no local facility".to_string()))?;

        let session = local
            .create_session(SessionOptions {
                system_prompt: SYSTEM_PROMPT.to_string(),
                temperature: request.mode.temperature(),
                top_k: SESSION_TOP_K,
            })
            .await?;

        let text = session.prompt(&prompt::build_for(request)).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LocalInferenceError::EmptyOutput);
        }
        Ok(text.to_string())
    }

    fn settle(&self, phase: AdvisoryState, result: AdvisoryResult) -> AdvisoryResult {
        let mut state = self.lock_state();
        state.phase = phase;
        state.last_result = Some(result.clone());
        result
    }

    fn set_phase(&self, phase: AdvisoryState) {
        self.lock_state().phase = phase;
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::local::{LocalSession, SessionAvailability};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct CountingBoundary {
        calls: AtomicUsize,
        reply: Result<AdvisoryResult, BoundaryError>,
    }

    impl CountingBoundary {
        fn new(reply: Result<AdvisoryResult, BoundaryError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AdvisoryBoundary for CountingBoundary {
        async fn request_advisory(
            &self,
            _request: &AdvisoryRequest,
        ) -> Result<AdvisoryResult, BoundaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct RecordingFacility {
        output: Result<String, LocalInferenceError>,
        options: Mutex<Vec<SessionOptions>>,
    }

    struct FixedSession(Result<String, LocalInferenceError>);

    #[async_trait]
    impl LocalSession for FixedSession {
        async fn prompt(&self, _text: &str) -> Result<String, LocalInferenceError> {
            self.0.clone()
        }
    }

    #[async_trait]
    impl LocalInference for RecordingFacility {
        async fn can_create_session(&self) -> Result<SessionAvailability, LocalInferenceError> {
            Ok(SessionAvailability::Readily)
        }

        async fn create_session(
            &self,
            options: SessionOptions,
        ) -> Result<Box<dyn LocalSession>, LocalInferenceError> {
            self.options.lock().unwrap().push(options);
            Ok(Box::new(FixedSession(self.output.clone())))
        }
    }

    fn facility(output: Result<String, LocalInferenceError>) -> Arc<RecordingFacility> {
        Arc::new(RecordingFacility {
            output,
            options: Mutex::new(Vec::new()),
        })
    }

    fn orchestrator(
        local: &Arc<RecordingFacility>,
        boundary: &Arc<CountingBoundary>,
    ) -> AdvisoryOrchestrator {
        let local: Arc<dyn LocalInference> = local.clone();
        let boundary: Arc<dyn AdvisoryBoundary> = boundary.clone();
        AdvisoryOrchestrator::with_capability(CapabilityStatus::Readily, Some(local), boundary)
    }

    #[tokio::test]
    async fn test_session_temperature_follows_mode() {
        let local = facility(Ok("Hola.".to_string()));
        let boundary = CountingBoundary::new(Err(BoundaryError::Transport("unused".into())));
        let orchestrator = orchestrator(&local, &boundary);

        orchestrator
            .generate(AdvisoryRequest::translate("Hello.", "es"))
            .await;
        orchestrator.generate(AdvisoryRequest::advice(json!({}))).await;

        let options = local.options.lock().unwrap().clone();
        assert_eq!(options.len(), 2);
        assert!(options[0].temperature < options[1].temperature);
        assert_eq!(options[0].system_prompt, SYSTEM_PROMPT);
        assert_eq!(options[0].top_k, SESSION_TOP_K);
        assert_eq!(boundary.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_local_output_degrades_to_remote() {
        let local = facility(Ok("   ".to_string()));
        let boundary = CountingBoundary::new(Ok(AdvisoryResult::new("Remote text", "gemini:v1:m")));
        let orchestrator = orchestrator(&local, &boundary);

        let result = orchestrator.generate(AdvisoryRequest::advice(json!({}))).await;
        assert_eq!(result.provider, "gemini:v1:m");
        assert_eq!(boundary.calls(), 1);
        assert_eq!(orchestrator.state(), AdvisoryState::Settled);
    }

    #[tokio::test]
    async fn test_boundary_failure_settles_as_failed() {
        let boundary = CountingBoundary::new(Err(BoundaryError::Status {
            status: 502,
            body: "bad gateway".into(),
        }));
        let dyn_boundary: Arc<dyn AdvisoryBoundary> = boundary.clone();
        let orchestrator =
            AdvisoryOrchestrator::with_capability(CapabilityStatus::No, None, dyn_boundary);

        assert_eq!(orchestrator.state(), AdvisoryState::Idle);
        let result = orchestrator.generate(AdvisoryRequest::advice(json!({}))).await;

        assert_eq!(result.provider, PROVIDER_ERROR);
        assert_eq!(result.text, UNABLE_TO_GENERATE);
        assert_eq!(orchestrator.state(), AdvisoryState::Failed);
        assert_eq!(orchestrator.last_provider().as_deref(), Some(PROVIDER_ERROR));
        assert!(!orchestrator.is_generating());
    }

    #[tokio::test]
    async fn test_blank_remote_text_settles_as_failed() {
        let boundary = CountingBoundary::new(Ok(AdvisoryResult::new("  ", "custom")));
        let dyn_boundary: Arc<dyn AdvisoryBoundary> = boundary.clone();
        let orchestrator =
            AdvisoryOrchestrator::with_capability(CapabilityStatus::Unavailable, None, dyn_boundary);

        let result = orchestrator.generate(AdvisoryRequest::advice(json!({}))).await;
        assert_eq!(result.text, UNABLE_TO_GENERATE);
        assert_eq!(result.provider, PROVIDER_ERROR);
        assert_eq!(orchestrator.state(), AdvisoryState::Failed);
        assert_eq!(boundary.calls(), 1);
    }

    #[tokio::test]
    async fn test_readily_without_facility_uses_remote() {
        let boundary = CountingBoundary::new(Ok(AdvisoryResult::new("Remote", "stub")));
        let dyn_boundary: Arc<dyn AdvisoryBoundary> = boundary.clone();
        let orchestrator =
            AdvisoryOrchestrator::with_capability(CapabilityStatus::Readily, None, dyn_boundary);

        let result = orchestrator.generate(AdvisoryRequest::rewrite("Long text")).await;
        assert_eq!(result.provider, "stub");
        assert_eq!(boundary.calls(), 1);
    }
}

//! Advisory generation pipeline
//!
//! Decides where a travel advisory is produced and guarantees that every
//! user action ends with a non-empty advisory.
//!
//! ## Architecture
//!
//! - **Prompt builder** ([`prompt`]): pure, mode-specific prompt assembly
//! - **Capability prober** ([`capability`]): one-shot readiness check of the
//!   injected local inference facility ([`local`])
//! - **Cascade resolver** ([`cascade`]): ordered attempts over
//!   [`candidates`] against a remote [`provider`], with the [`stub`] as the
//!   last resort
//! - **Orchestrator** ([`orchestrator`]): on-device first, then the remote
//!   side through an [`boundary::AdvisoryBoundary`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flightcast::advisory::{
//!     AdvisoryOrchestrator, AdvisoryRequest, CascadeResolver, InProcessBoundary,
//! };
//! use flightcast::config::RemoteConfig;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let resolver = CascadeResolver::from_config(&RemoteConfig::default())
//!         .expect("failed to build resolver");
//!     let boundary = Arc::new(InProcessBoundary::new(Arc::new(resolver)));
//!     let orchestrator = AdvisoryOrchestrator::initialize(None, boundary).await;
//!
//!     let context = serde_json::json!({"flight": {"origin": "LAX", "destination": "JFK"}});
//!     let result = orchestrator.generate(AdvisoryRequest::advice(context)).await;
//!     println!("[{}] {}", result.provider, result.text);
//! });
//! ```

pub mod boundary;
pub mod candidates;
pub mod capability;
pub mod cascade;
pub mod local;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod stub;
pub mod types;

pub use boundary::{AdvisoryBoundary, HttpBoundary, InProcessBoundary, ADVISORY_ROUTE};
pub use candidates::{Candidate, CandidateList};
pub use cascade::CascadeResolver;
pub use local::{LocalInference, LocalSession, OllamaInference, SessionAvailability, SessionOptions};
pub use orchestrator::{AdvisoryOrchestrator, AdvisoryState};
pub use provider::{GeminiProvider, GenerationProvider};
pub use types::{
    AdvisoryMode, AdvisoryRequest, AdvisoryResult, CapabilityStatus, PROVIDER_ERROR,
    PROVIDER_ON_DEVICE, PROVIDER_STUB, PROVIDER_STUB_FALLBACK,
};

//! Error types for the advisory pipeline
//!
//! Each concern owns its error enum. Most of them never reach the caller of
//! [`crate::advisory::AdvisoryOrchestrator::generate`]: they are absorbed and
//! turned into degraded results at the lowest layer that can do so.

use thiserror::Error;

use crate::advisory::AdvisoryMode;

/// Failure of a single call to a remote generation provider
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider unreachable: {0}")]
    Transport(String),

    #[error("provider response carried no text: {0}")]
    EmptyResponse(String),

    #[error("provider setup failed: {0}")]
    Setup(String),
}

impl ProviderError {
    /// Whether the failure says something about the provider itself rather
    /// than about the candidate that was asked.
    ///
    /// Server-class statuses and transport failures (including timeouts) are
    /// systemic. Client-class statuses and unusable bodies only rule out the
    /// current candidate.
    pub fn is_systemic(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => *status >= 500,
            ProviderError::Transport(_) => true,
            ProviderError::EmptyResponse(_) | ProviderError::Setup(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Hard failure of the remote cascade
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CascadeError {
    #[error("cascade aborted at candidate {candidate} after {attempts} attempt(s): {source}")]
    Systemic {
        candidate: String,
        attempts: usize,
        #[source]
        source: ProviderError,
    },
}

/// Failure of the host-provided local inference facility
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocalInferenceError {
    #[error("local inference facility unreachable: {0}")]
    Unreachable(String),

    #[error("local session failed: {0}")]
    Session(String),

    #[error("local session returned no text")]
    EmptyOutput,
}

/// Failure of the call that delegates an advisory to the remote side
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoundaryError {
    #[error("advisory boundary unreachable: {0}")]
    Transport(String),

    #[error("advisory boundary returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("advisory boundary response could not be decoded: {0}")]
    Decode(String),

    #[error("remote resolution failed: {0}")]
    Upstream(String),
}

/// Caller-side precondition violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdvisoryError {
    #[error("{mode} requires non-empty prior advisory text")]
    MissingPriorText { mode: AdvisoryMode },

    #[error("translate requires a target language")]
    MissingLanguage,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gateway server error: {0}")]
    Serve(#[source] std::io::Error),
}

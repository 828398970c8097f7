use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdvisoryError;

/// Provider tag for advisories produced by the local inference facility.
pub const PROVIDER_ON_DEVICE: &str = "on-device";
/// Provider tag for the zero-configuration demo path.
pub const PROVIDER_STUB: &str = "stub";
/// Provider tag used when every remote candidate failed.
pub const PROVIDER_STUB_FALLBACK: &str = "stub-fallback";
/// Provider tag used when the remote side could not be reached at all.
pub const PROVIDER_ERROR: &str = "error";

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryMode {
    Advice,
    Translate,
    Rewrite,
}

impl AdvisoryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisoryMode::Advice => "advice",
            AdvisoryMode::Translate => "translate",
            AdvisoryMode::Rewrite => "rewrite",
        }
    }

    /// Sampling temperature for an on-device session in this mode.
    pub fn temperature(&self) -> f64 {
        match self {
            AdvisoryMode::Translate => 0.3,
            AdvisoryMode::Advice | AdvisoryMode::Rewrite => 0.7,
        }
    }

    /// Whether the mode works on an existing advisory.
    pub fn needs_prior_text(&self) -> bool {
        !matches!(self, AdvisoryMode::Advice)
    }
}

impl fmt::Display for AdvisoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdvisoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "advice" => Ok(AdvisoryMode::Advice),
            "translate" => Ok(AdvisoryMode::Translate),
            "rewrite" => Ok(AdvisoryMode::Rewrite),
            other => Err(format!(
                "unknown advisory mode '{}', expected advice, translate or rewrite",
                other
            )),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

/// One user action, built fresh per click and never retained.
///
/// The same shape travels over the advisory boundary as JSON
/// (`{mode, language, priorText, context}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryRequest {
    pub mode: AdvisoryMode,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub prior_text: String,
    /// Flight/weather/prediction snapshot. Opaque to the pipeline.
    #[serde(default)]
    pub context: Value,
}

impl AdvisoryRequest {
    pub fn advice(context: Value) -> Self {
        Self {
            mode: AdvisoryMode::Advice,
            language: default_language(),
            prior_text: String::new(),
            context,
        }
    }

    pub fn translate(prior_text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            mode: AdvisoryMode::Translate,
            language: language.into(),
            prior_text: prior_text.into(),
            context: Value::Null,
        }
    }

    pub fn rewrite(prior_text: impl Into<String>) -> Self {
        Self {
            mode: AdvisoryMode::Rewrite,
            language: default_language(),
            prior_text: prior_text.into(),
            context: Value::Null,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Check the caller-side preconditions.
    ///
    /// The pipeline itself never calls this; front ends do before they
    /// submit an action.
    pub fn validate(&self) -> Result<(), AdvisoryError> {
        if self.mode.needs_prior_text() && self.prior_text.trim().is_empty() {
            return Err(AdvisoryError::MissingPriorText { mode: self.mode });
        }
        if self.mode == AdvisoryMode::Translate && self.language.trim().is_empty() {
            return Err(AdvisoryError::MissingLanguage);
        }
        Ok(())
    }
}

/// What the pipeline hands back for every action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryResult {
    pub text: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<String>,
}

impl AdvisoryResult {
    pub fn new(text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            error_info: None,
        }
    }

    pub fn with_error_info(mut self, error_info: impl Into<String>) -> Self {
        self.error_info = Some(error_info.into());
        self
    }

    pub fn is_stub(&self) -> bool {
        self.provider == PROVIDER_STUB || self.provider == PROVIDER_STUB_FALLBACK
    }
}

/// Readiness of on-device inference for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityStatus {
    /// Probe has not completed yet
    #[default]
    Unknown,
    Readily,
    AfterDownload,
    No,
    Error,
    /// No local inference facility at all
    Unavailable,
}

impl CapabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityStatus::Unknown => "unknown",
            CapabilityStatus::Readily => "readily",
            CapabilityStatus::AfterDownload => "after-download",
            CapabilityStatus::No => "no",
            CapabilityStatus::Error => "error",
            CapabilityStatus::Unavailable => "unavailable",
        }
    }

    /// Whether the orchestrator should attempt the on-device path.
    pub fn allows_on_device(&self) -> bool {
        matches!(
            self,
            CapabilityStatus::Readily | CapabilityStatus::AfterDownload
        )
    }
}

impl fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

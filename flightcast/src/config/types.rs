use serde::{Deserialize, Serialize};

use crate::advisory::candidates::{DEFAULT_ENDPOINT_VERSIONS, DEFAULT_PREFERRED_MODEL};
use crate::error::ConfigError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_GATEWAY_BIND_ADDR: &str = "127.0.0.1:8787";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightcastConfig {
    pub remote: RemoteConfig,
    pub local: LocalConfig,
    pub gateway: GatewayConfig,
}

/// Remote generation provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API key. Blank counts as unconfigured.
    pub api_key: Option<String>,
    /// Preferred model identifier, interpolated into the candidate list
    pub preferred_model: Option<String>,
    pub base_url: String,
    /// Endpoint versions, most capable first
    pub endpoint_versions: Vec<String>,
    /// Upper bound for a single candidate call
    pub candidate_timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            preferred_model: Some(DEFAULT_PREFERRED_MODEL.to_string()),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            endpoint_versions: DEFAULT_ENDPOINT_VERSIONS
                .iter()
                .map(|v| v.to_string())
                .collect(),
            candidate_timeout_seconds: 8,
        }
    }
}

impl RemoteConfig {
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Local (on-device) inference configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// When false the facility is absent and capability is `unavailable`
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Report `after-download` instead of `no` when the model is missing
    pub allow_download: bool,
    pub timeout_seconds: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: "llama3.2".to_string(),
            allow_download: false,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_addr: String,
    /// Base URL clients use to reach the gateway
    pub url: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_GATEWAY_BIND_ADDR.to_string(),
            url: None,
            request_timeout_seconds: 60,
        }
    }
}

impl FlightcastConfig {
    /// Create a configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: FlightcastConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Create a configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides on top of this configuration.
    ///
    /// `lookup` is the variable source, `std::env::var` outside of tests.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("FLIGHTCAST_API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
            self.remote.api_key = Some(key);
        }
        if let Some(model) = lookup("FLIGHTCAST_MODEL") {
            self.remote.preferred_model = Some(model);
        }
        if let Some(url) = lookup("FLIGHTCAST_BASE_URL") {
            self.remote.base_url = url;
        }
        if let Some(versions) = lookup("FLIGHTCAST_ENDPOINT_VERSIONS") {
            self.remote.endpoint_versions = versions
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
        }
        if let Some(timeout) = lookup("FLIGHTCAST_CANDIDATE_TIMEOUT") {
            self.remote.candidate_timeout_seconds =
                parse_env("FLIGHTCAST_CANDIDATE_TIMEOUT", &timeout)?;
        }

        if let Some(enabled) = lookup("FLIGHTCAST_LOCAL_ENABLED") {
            self.local.enabled = parse_flag("FLIGHTCAST_LOCAL_ENABLED", &enabled)?;
        }
        if let Some(url) = lookup("FLIGHTCAST_LOCAL_URL") {
            self.local.base_url = url;
        }
        if let Some(model) = lookup("FLIGHTCAST_LOCAL_MODEL") {
            self.local.model = model;
        }

        if let Some(addr) = lookup("FLIGHTCAST_BIND_ADDR") {
            self.gateway.bind_addr = addr;
        }
        if let Some(url) = lookup("FLIGHTCAST_GATEWAY_URL") {
            self.gateway.url = Some(url);
        }

        Ok(self)
    }

    /// Load the file when given, then apply the environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.remote.base_url.trim().is_empty() {
            errors.push("remote.base_url must not be empty".to_string());
        }
        if self.remote.candidate_timeout_seconds == 0 {
            errors.push("remote.candidate_timeout_seconds must be positive".to_string());
        }
        if self.local.enabled && self.local.model.trim().is_empty() {
            errors.push("local.model is required when local inference is enabled".to_string());
        }
        if self.gateway.bind_addr.trim().is_empty() {
            errors.push("gateway.bind_addr must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

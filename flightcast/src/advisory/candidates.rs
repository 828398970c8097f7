//! Ordered (endpoint version, model) candidates for the remote cascade.

use std::fmt;

use itertools::Itertools;

/// Model used when no preferred model is configured.
pub const DEFAULT_PREFERRED_MODEL: &str = "gemini-1.5-flash";

/// Endpoint versions, most capable first.
pub const DEFAULT_ENDPOINT_VERSIONS: &[&str] = &["v1beta", "v1"];

/// Suffix variants the preferred model is interpolated into.
const MODEL_VARIANTS: &[&str] = &["{model}", "{model}-latest", "{model}-001", "{model}-002"];

/// Models known to answer `generateContent`, tried after the preferred ones.
const KNOWN_GOOD_MODELS: &[&str] = &[
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro",
    "gemini-pro",
];

const VERSION_SUFFIXES: &[&str] = &["-latest", "-001", "-002"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub version: String,
    pub model: String,
}

impl Candidate {
    pub fn new(version: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            model: model.into(),
        }
    }

    /// Provider tag reported when this candidate answers, e.g.
    /// `gemini:v1beta:gemini-1.5-flash`.
    pub fn provider_tag(&self, scheme: &str) -> String {
        format!("{}:{}", scheme, self)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.version, self.model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
}

impl CandidateList {
    /// Build the list for a preferred model and a set of endpoint versions.
    ///
    /// Versions are the outer order, models the inner one. The preferred
    /// model as given always comes first within a version. Blank inputs fall
    /// back to the built-in defaults.
    pub fn build(preferred_model: Option<&str>, versions: &[String]) -> Self {
        let preferred = preferred_model
            .map(normalize_model)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_PREFERRED_MODEL.to_string());
        let base = base_model(&preferred);

        let models: Vec<String> = std::iter::once(preferred.clone())
            .chain(MODEL_VARIANTS.iter().map(|v| v.replace("{model}", base)))
            .chain(KNOWN_GOOD_MODELS.iter().map(|m| m.to_string()))
            .unique()
            .collect();

        let versions: Vec<String> = {
            let configured: Vec<String> = versions
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unique()
                .collect();
            if configured.is_empty() {
                DEFAULT_ENDPOINT_VERSIONS.iter().map(|v| v.to_string()).collect()
            } else {
                configured
            }
        };

        let candidates = versions
            .iter()
            .cartesian_product(models.iter())
            .map(|(version, model)| Candidate::new(version.clone(), model.clone()))
            .unique()
            .collect();

        Self { candidates }
    }

    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates: candidates.into_iter().unique().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn first(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn last(&self) -> Option<&Candidate> {
        self.candidates.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

fn normalize_model(model: &str) -> String {
    let trimmed = model.trim();
    trimmed
        .strip_prefix("models/")
        .unwrap_or(trimmed)
        .to_string()
}

fn base_model(model: &str) -> &str {
    VERSION_SUFFIXES
        .iter()
        .find_map(|suffix| model.strip_suffix(suffix))
        .unwrap_or(model)
}

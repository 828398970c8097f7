//! Deterministic advisory text used when no live generation path answers.

use serde_json::Value;

use super::types::{
    AdvisoryMode, AdvisoryRequest, AdvisoryResult, PROVIDER_STUB, PROVIDER_STUB_FALLBACK,
};

/// Shown by the orchestrator when the remote side cannot be reached.
pub const UNABLE_TO_GENERATE: &str =
    "We were unable to generate a travel advisory right now. Please try again in a moment.";

const REWRITE_WORD_LIMIT: usize = 120;

/// Stub result for the zero-configuration path.
pub fn stub_result(request: &AdvisoryRequest) -> AdvisoryResult {
    AdvisoryResult::new(stub_text(request), PROVIDER_STUB)
}

/// Stub result after every remote candidate failed.
pub fn fallback_result(request: &AdvisoryRequest, last_error: Option<String>) -> AdvisoryResult {
    let result = AdvisoryResult::new(stub_text(request), PROVIDER_STUB_FALLBACK);
    match last_error {
        Some(error) => result.with_error_info(error),
        None => result,
    }
}

/// Deterministic, never empty.
pub fn stub_text(request: &AdvisoryRequest) -> String {
    let prior = request.prior_text.trim();
    match request.mode {
        AdvisoryMode::Translate if !prior.is_empty() => format!(
            "(Translation to {} is not available in demo mode. Original advisory follows.)\n\n{}",
            request.language, prior
        ),
        AdvisoryMode::Rewrite if !prior.is_empty() => shorten(prior, REWRITE_WORD_LIMIT),
        _ => demo_advice(&request.context),
    }
}

fn demo_advice(context: &Value) -> String {
    let route = match (
        context_str(context, "/flight/origin"),
        context_str(context, "/flight/destination"),
    ) {
        (Some(origin), Some(destination)) => format!("{} to {}", origin, destination),
        _ => "your flight".to_string(),
    };

    format!(
        "Demo travel advisory for {}\n\
         \n\
         - Check your airline's app for gate and schedule changes before leaving.\n\
         - Allow extra time for security and check-in at busy hours.\n\
         - Keep essentials (medication, chargers, documents) in your carry-on.\n\
         - Weather and delay estimates shown on the dashboard are forecasts, not guarantees.\n\
         \n\
         What to do next\n\
         1. Confirm your flight status a few hours before departure.\n\
         2. Plan to arrive at the airport early.\n\
         3. Set up flight alerts so you hear about delays first.",
        route
    )
}

fn context_str<'a>(context: &'a Value, pointer: &str) -> Option<&'a str> {
    context
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn shorten(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return text.to_string();
    }
    format!("{}...", words[..limit].join(" "))
}

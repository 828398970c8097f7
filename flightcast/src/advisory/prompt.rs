//! Prompt construction for every advisory mode.
//!
//! Prompts are assembled from fixed template sections with `{var}`
//! placeholders. Building is pure: the same arguments always yield the same
//! bytes, and the context is serialized as-is without validation.

use serde_json::Value;

use super::types::{AdvisoryMode, AdvisoryRequest};

/// System instruction shared by on-device sessions and remote prompts.
pub const SYSTEM_PROMPT: &str = "You are a concise travel assistant for air travelers. \
You turn flight, weather and delay-prediction data into practical advice. \
Prefer short bullet points and never invent data that is not given to you.";

/// `top_k` used when opening an on-device session.
pub const SESSION_TOP_K: u32 = 3;

#[derive(Clone, Debug)]
struct PromptTemplate {
    id: &'static str,
    sections: &'static [&'static str],
}

const ADVICE_TEMPLATE: PromptTemplate = PromptTemplate {
    id: "advice",
    sections: &[
        "{system}",
        "Task: write a travel advisory for the flight described in the context below.",
        "Rules:\n\
         - Use bullet points.\n\
         - Use only the data in the context. Do not invent delays, gates, weather or airline policies.\n\
         - If a value is missing or null, say that it is unavailable.\n\
         - Length: 120-180 words.\n\
         - End with a section titled \"What to do next\" listing 2-3 concrete steps.",
        "Context (JSON):\n{context}",
    ],
};

const TRANSLATE_TEMPLATE: PromptTemplate = PromptTemplate {
    id: "translate",
    sections: &[
        "{system}",
        "Task: translate the travel advisory below into {language}.",
        "Keep the meaning, the structure and every bullet point. Use a natural, \
         traveler-friendly tone. Return only the translated advisory.",
        "Advisory:\n{prior_text}",
    ],
};

const REWRITE_TEMPLATE: PromptTemplate = PromptTemplate {
    id: "rewrite",
    sections: &[
        "{system}",
        "Task: rewrite the travel advisory below in at most 120 words.",
        "Keep every recommendation and the \"What to do next\" steps. \
         Return only the rewritten advisory.",
        "Advisory:\n{prior_text}",
    ],
};

fn template_for(mode: AdvisoryMode) -> &'static PromptTemplate {
    match mode {
        AdvisoryMode::Advice => &ADVICE_TEMPLATE,
        AdvisoryMode::Translate => &TRANSLATE_TEMPLATE,
        AdvisoryMode::Rewrite => &REWRITE_TEMPLATE,
    }
}

/// Build the prompt for one advisory action.
///
/// `language` only matters for [`AdvisoryMode::Translate`] and `prior_text`
/// only for translate/rewrite; both are ignored by the advice template.
pub fn build(mode: AdvisoryMode, language: &str, prior_text: &str, context: &Value) -> String {
    let context_json = serialize_context(context);
    let vars = [
        ("system", SYSTEM_PROMPT),
        ("language", language),
        ("prior_text", prior_text),
        ("context", context_json.as_str()),
    ];
    render(template_for(mode), &vars)
}

pub fn build_for(request: &AdvisoryRequest) -> String {
    build(
        request.mode,
        &request.language,
        &request.prior_text,
        &request.context,
    )
}

/// Template identifier, used as a log field.
pub fn template_id(mode: AdvisoryMode) -> &'static str {
    template_for(mode).id
}

fn serialize_context(context: &Value) -> String {
    serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string())
}

fn render(template: &PromptTemplate, vars: &[(&str, &str)]) -> String {
    let mut buf = String::new();
    for section in template.sections {
        buf.push_str(&substitute(section, vars));
        if !buf.ends_with('\n') {
            buf.push('\n');
        }
        buf.push('\n');
    }
    buf
}

// Single pass over the template so substituted values are never rescanned.
fn substitute(section: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(section.len());
    let mut rest = section;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

//! LLM-based intent classification of GIS queries.
//!
//! The model is asked for `{"intent": "<label>"}`. By default the whole reply
//! must be that JSON object and the label must match one of
//! [`INTENT_LABELS`] exactly; anything else is classified as `unknown`.
//! [`IntentParsing::Lenient`] relaxes this for chatty models. Only service
//! failures are errors.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::debug;

use geobench_core::UNKNOWN_INTENT;

use crate::error::ServiceError;
use crate::llm::{ChatMessage, CompletionRequest, CompletionService};

/// The closed label set.
pub const INTENT_LABELS: [&str; 7] = [
    "weather",
    "road",
    "risk",
    "construction",
    "comparison",
    "geospatial",
    UNKNOWN_INTENT,
];

fn system_prompt() -> String {
    format!(
        "You are an expert GIS query classifier.\n\
         Classify the user's query into exactly ONE of the following labels:\n\n\
         {}\n\n\
         Rules:\n\
         - Output ONLY valid JSON\n\
         - Do NOT explain your reasoning\n\
         - If uncertain, choose 'unknown'\n\n\
         JSON format:\n\
         {{ \"intent\": \"<label>\" }}",
        INTENT_LABELS.join(", ")
    )
}

fn json_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("static regex"))
}

/// How a classification reply is turned into a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntentParsing {
    /// The reply must parse as a JSON object as a whole, and its `intent`
    /// must be a label verbatim.
    #[default]
    Strict,
    /// Use the first `{...}` found anywhere in the reply and compare the
    /// label trimmed and lower-cased. Replies that strict parsing scores as
    /// `unknown` may classify here.
    Lenient,
}

fn intent_field(object: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(object).ok()?;
    value.get("intent")?.as_str().map(str::to_string)
}

/// Map a raw model reply to a label.
pub fn parse_intent(reply: &str, parsing: IntentParsing) -> String {
    let label = match parsing {
        IntentParsing::Strict => intent_field(reply),
        IntentParsing::Lenient => json_object()
            .find(reply)
            .and_then(|m| intent_field(m.as_str()))
            .map(|l| l.trim().to_lowercase()),
    };

    match label {
        Some(l) if INTENT_LABELS.contains(&l.as_str()) => l,
        _ => UNKNOWN_INTENT.to_string(),
    }
}

/// Classifies queries with the model under test, at temperature 0.
#[derive(Clone)]
pub struct IntentClassifier {
    service: Arc<dyn CompletionService>,
    parsing: IntentParsing,
}

impl IntentClassifier {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            parsing: IntentParsing::default(),
        }
    }

    pub fn with_parsing(mut self, parsing: IntentParsing) -> Self {
        self.parsing = parsing;
        self
    }

    pub fn parsing(&self) -> IntentParsing {
        self.parsing
    }

    pub fn request(model: &str, query: &str) -> CompletionRequest {
        CompletionRequest {
            model: model.to_string(),
            temperature: 0.0,
            messages: vec![
                ChatMessage::system(system_prompt()),
                ChatMessage::user(format!("Query: {}", query)),
            ],
        }
    }

    pub async fn classify(&self, model: &str, query: &str) -> Result<String, ServiceError> {
        let reply = self.service.complete(&Self::request(model, query)).await?;
        let intent = parse_intent(&reply, self.parsing);
        debug!(model = %model, intent = %intent, "classified query");
        Ok(intent)
    }
}

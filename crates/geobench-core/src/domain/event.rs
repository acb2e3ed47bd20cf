//! Agent event stream payloads.

use serde::{Deserialize, Serialize};

/// Distinguished intent label meaning "no usable classification".
pub const UNKNOWN_INTENT: &str = "unknown";

/// One recorded reasoning step with its observed output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStep {
    pub iteration: u32,

    #[serde(default)]
    pub intent: String,

    /// Tool or reasoning action taken. Empty means no tool was invoked.
    #[serde(default)]
    pub action: String,

    #[serde(default)]
    pub observation: String,
}

impl TraceStep {
    pub fn new(
        iteration: u32,
        intent: impl Into<String>,
        action: impl Into<String>,
        observation: impl Into<String>,
    ) -> Self {
        Self {
            iteration,
            intent: intent.into(),
            action: action.into(),
            observation: observation.into(),
        }
    }

    /// Whether this step counts as a tool invocation.
    pub fn has_action(&self) -> bool {
        !self.action.is_empty()
    }
}

/// A single event produced by an agent while answering one query.
///
/// A well-formed stream is one `IntentClassification`, zero or more
/// `IterationUpdate`s and exactly one `FinalAnswer`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The query was assigned an intent label.
    IntentClassification { intent: String },

    /// Reasoning loop progress; `current` is monotonic within a run.
    IterationUpdate { current: u32 },

    /// Terminal event carrying the answer and the reasoning trace.
    FinalAnswer {
        content: String,
        #[serde(default)]
        details: Vec<TraceStep>,
    },
}

impl AgentEvent {
    /// The wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentEvent::IntentClassification { .. } => "intent_classification",
            AgentEvent::IterationUpdate { .. } => "iteration_update",
            AgentEvent::FinalAnswer { .. } => "final_answer",
        }
    }
}

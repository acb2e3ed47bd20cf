//! GeoBench Agent
//!
//! The agent collaborator benchmarked by GeoBench: an Ollama-backed
//! completion client, an LLM intent classifier, and a GIS reasoning agent
//! that reports its progress as an [`geobench_core::AgentEventStream`].

pub mod error;
pub mod fakes;
pub mod intent;
pub mod llm;
pub mod react;

pub use error::ServiceError;
pub use intent::{parse_intent, IntentClassifier, IntentParsing, INTENT_LABELS};
pub use llm::{
    ChatMessage, CompletionRequest, CompletionService, OllamaClient, OllamaConfig,
    DEFAULT_OLLAMA_URL,
};
pub use react::{GeoReasoningAgent, MAX_REASONING_ROUNDS, REASONING_ACTION};

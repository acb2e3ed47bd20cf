//! GIS reasoning agent exposed as an [`AgentProvider`].
//!
//! Every `run_query` call opens a fresh session that yields, in order:
//! 1. `intent_classification` from the [`IntentClassifier`]
//! 2. `iteration_update` for 1..=min(max_iterations, 3)
//! 3. `final_answer` carrying a model-generated observation and a one-step
//!    trace (`geospatial_reasoning`)
//!
//! A completion failure ends the stream with an error item.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::debug;

use geobench_core::{AgentError, AgentEvent, AgentEventStream, AgentProvider, AgentSettings, TraceStep};

use crate::intent::{IntentClassifier, IntentParsing};
use crate::llm::{ChatMessage, CompletionRequest, CompletionService};

/// Upper bound on reasoning rounds reported per query.
pub const MAX_REASONING_ROUNDS: u32 = 3;

/// Trace action recorded for the observation step.
pub const REASONING_ACTION: &str = "geospatial_reasoning";

const DEFAULT_ITERATION_PAUSE: Duration = Duration::from_millis(50);

fn observation_prompt(query: &str, intent: &str) -> String {
    format!(
        "You are a GIS reasoning agent.\n\n\
         Query:\n\"{query}\"\n\n\
         Inferred intent:\n\"{intent}\"\n\n\
         Provide a concise geospatial observation or inference\n\
         based on typical GIS datasets (terrain, climate, risk,\n\
         infrastructure, land characteristics). Do NOT mention\n\
         missing data or APIs.\n"
    )
}

/// Agent that classifies, iterates and answers with the model under test.
#[derive(Clone)]
pub struct GeoReasoningAgent {
    service: Arc<dyn CompletionService>,
    classifier: IntentClassifier,
    iteration_pause: Duration,
}

impl GeoReasoningAgent {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            classifier: IntentClassifier::new(service.clone()),
            service,
            iteration_pause: DEFAULT_ITERATION_PAUSE,
        }
    }

    /// Reply parsing used for intent classification.
    pub fn with_intent_parsing(mut self, parsing: IntentParsing) -> Self {
        self.classifier = self.classifier.with_parsing(parsing);
        self
    }

    /// Pause between iteration updates.
    pub fn with_iteration_pause(mut self, pause: Duration) -> Self {
        self.iteration_pause = pause;
        self
    }
}

enum Phase {
    Classify,
    Iterate { intent: String, next: u32 },
    Observe { intent: String },
    Done,
}

struct Session {
    agent: GeoReasoningAgent,
    settings: AgentSettings,
    query: String,
    phase: Phase,
}

impl Session {
    fn rounds(&self) -> u32 {
        self.settings.max_iterations.min(MAX_REASONING_ROUNDS)
    }

    async fn next_event(&mut self) -> Option<Result<AgentEvent, AgentError>> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Classify => {
                    let intent = match self
                        .agent
                        .classifier
                        .classify(&self.settings.model_identifier, &self.query)
                        .await
                    {
                        Ok(intent) => intent,
                        Err(e) => return Some(Err(e.into())),
                    };
                    self.phase = Phase::Iterate {
                        intent: intent.clone(),
                        next: 1,
                    };
                    return Some(Ok(AgentEvent::IntentClassification { intent }));
                }
                Phase::Iterate { intent, next } if next <= self.rounds() => {
                    if !self.agent.iteration_pause.is_zero() {
                        tokio::time::sleep(self.agent.iteration_pause).await;
                    }
                    self.phase = Phase::Iterate {
                        intent,
                        next: next + 1,
                    };
                    return Some(Ok(AgentEvent::IterationUpdate { current: next }));
                }
                Phase::Iterate { intent, .. } => {
                    self.phase = Phase::Observe { intent };
                }
                Phase::Observe { intent } => {
                    return Some(self.observe(intent).await);
                }
                Phase::Done => return None,
            }
        }
    }

    async fn observe(&self, intent: String) -> Result<AgentEvent, AgentError> {
        let request = CompletionRequest {
            model: self.settings.model_identifier.clone(),
            temperature: self.settings.temperature,
            messages: vec![ChatMessage::user(observation_prompt(&self.query, &intent))],
        };
        let observation = self.agent.service.complete(&request).await?.trim().to_string();
        debug!(model = %self.settings.model_identifier, chars = observation.len(), "observation");

        let step = TraceStep::new(1, intent, REASONING_ACTION, observation.clone());
        Ok(AgentEvent::FinalAnswer {
            content: observation,
            details: vec![step],
        })
    }
}

impl AgentProvider for GeoReasoningAgent {
    fn run_query(&self, settings: &AgentSettings, query: &str) -> AgentEventStream {
        let session = Session {
            agent: self.clone(),
            settings: settings.clone(),
            query: query.to_string(),
            phase: Phase::Classify,
        };
        stream::unfold(session, |mut session| async move {
            let item = session.next_event().await?;
            Some((item, session))
        })
        .boxed()
    }
}

//! In-memory fakes for the agent seam (testing only)
//!
//! [`ScriptedAgent`] plays back a fixed sequence of steps per
//! (model identifier, query text) pair, which is enough to exercise the
//! recorder and orchestrator without any network access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::agent::{AgentEventStream, AgentProvider};
use crate::domain::{AgentError, AgentEvent, AgentSettings, TraceStep};

/// One scripted step of a fake agent session.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Emit(AgentEvent),
    Fail(String),
    Delay(Duration),
}

/// Agent provider that replays scripted steps.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    scripts: HashMap<(String, String), Vec<ScriptStep>>,
    default_script: Vec<ScriptStep>,
    invocations: Mutex<Vec<(String, String)>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script used for any pair without its own script.
    pub fn with_default(mut self, script: Vec<ScriptStep>) -> Self {
        self.default_script = script;
        self
    }

    /// Script for one (model identifier, query text) pair.
    pub fn with_script(
        mut self,
        model_identifier: &str,
        query_text: &str,
        script: Vec<ScriptStep>,
    ) -> Self {
        self.scripts.insert(
            (model_identifier.to_string(), query_text.to_string()),
            script,
        );
        self
    }

    /// `(model identifier, query text)` for every session opened, in order.
    pub fn invocations(&self) -> Vec<(String, String)> {
        self.invocations.lock().unwrap().clone()
    }

    /// A well-formed session: intent, `iterations` updates, one trace step
    /// per iteration using `action`.
    pub fn answering(intent: &str, iterations: u32, action: &str) -> Vec<ScriptStep> {
        let mut script = vec![ScriptStep::Emit(AgentEvent::IntentClassification {
            intent: intent.to_string(),
        })];
        for current in 1..=iterations {
            script.push(ScriptStep::Emit(AgentEvent::IterationUpdate { current }));
        }
        let details = (1..=iterations)
            .map(|i| TraceStep::new(i, intent, action, format!("observation {}", i)))
            .collect();
        script.push(ScriptStep::Emit(AgentEvent::FinalAnswer {
            content: format!("answer for {}", intent),
            details,
        }));
        script
    }
}

impl AgentProvider for ScriptedAgent {
    fn run_query(&self, settings: &AgentSettings, query: &str) -> AgentEventStream {
        let key = (settings.model_identifier.clone(), query.to_string());
        self.invocations.lock().unwrap().push(key.clone());

        let script = self
            .scripts
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.default_script.clone());

        stream::iter(script)
            .then(|step| async move {
                match step {
                    ScriptStep::Delay(d) => {
                        tokio::time::sleep(d).await;
                        None
                    }
                    ScriptStep::Emit(event) => Some(Ok(event)),
                    ScriptStep::Fail(message) => Some(Err(AgentError::Stream(message))),
                }
            })
            .filter_map(|item| async move { item })
            .boxed()
    }
}

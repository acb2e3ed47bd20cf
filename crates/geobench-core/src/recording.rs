//! Run recorder: drives one agent event stream into one [`RunResult`].
//!
//! Usage:
//! 1. Build a [`RunRecorder`] around an [`AgentProvider`].
//! 2. Call [`RunRecorder::record_run`] per (model, query) pair.
//!
//! `record_run` never fails. Stream errors and timeouts become failed Run
//! Results. A stream that simply runs out before a final answer still counts
//! as a success, with an empty trace.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tracing::{debug, warn, Instrument};

use crate::agent::{AgentEventStream, AgentProvider};
use crate::domain::{
    AgentError, AgentEvent, ModelConfig, Query, RunIdentity, RunMeasurements, RunResult,
    TraceStep,
};
use crate::metrics::METRICS;

/// Pair-local state built up from the event stream.
#[derive(Debug, Default)]
struct RunAccumulator {
    classified_intent: Option<String>,
    iterations_used: u32,
    iteration_details: Vec<TraceStep>,
    final_answer_seen: bool,
}

impl RunAccumulator {
    fn apply(&mut self, event: AgentEvent) {
        debug!(kind = event.kind(), "agent event");
        METRICS.inc_events_consumed();
        match event {
            AgentEvent::IntentClassification { intent } => {
                self.classified_intent = Some(intent);
            }
            AgentEvent::IterationUpdate { current } => {
                self.iterations_used = current;
            }
            AgentEvent::FinalAnswer { details, .. } => {
                self.iteration_details = details;
                self.final_answer_seen = true;
            }
        }
    }

    async fn drive(&mut self, mut stream: AgentEventStream) -> Result<(), AgentError> {
        while let Some(item) = stream.next().await {
            self.apply(item?);
        }
        if !self.final_answer_seen {
            warn!(
                iterations = self.iterations_used,
                "agent stream ended without a final answer"
            );
        }
        Ok(())
    }

    fn finish(
        self,
        identity: RunIdentity,
        elapsed: Duration,
        outcome: Result<(), AgentError>,
    ) -> RunResult {
        let measurements = RunMeasurements {
            classified_intent: self.classified_intent,
            response_time_sec: elapsed.as_secs_f64(),
            iterations_used: self.iterations_used,
        };
        match outcome {
            Ok(()) => RunResult::completed(identity, measurements, self.iteration_details),
            Err(err) => RunResult::failed(identity, measurements, err.to_string()),
        }
    }
}

/// Records single (model, query) runs against an agent provider.
pub struct RunRecorder {
    provider: Arc<dyn AgentProvider>,
    run_timeout: Option<Duration>,
}

impl RunRecorder {
    /// Create a recorder with no per-run deadline.
    pub fn new(provider: Arc<dyn AgentProvider>) -> Self {
        Self {
            provider,
            run_timeout: None,
        }
    }

    /// Fail any run that has not finished within `timeout`.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout
    }

    /// Run `query` on `model` and return the completed record.
    pub async fn record_run(&self, model: &ModelConfig, query: &Query) -> RunResult {
        let span = crate::obs::run_span(&model.name, &query.id);
        self.record_run_inner(model, query).instrument(span).await
    }

    async fn record_run_inner(&self, model: &ModelConfig, query: &Query) -> RunResult {
        crate::obs::emit_run_started(&model.name, &query.id);

        let start = Instant::now();
        let mut acc = RunAccumulator::default();
        let stream = self.provider.run_query(&model.agent_settings(), &query.text);

        let outcome = match self.run_timeout {
            Some(limit) => match tokio::time::timeout(limit, acc.drive(stream)).await {
                Ok(res) => res,
                Err(_) => Err(AgentError::Timeout {
                    secs: limit.as_secs_f64(),
                }),
            },
            None => acc.drive(stream).await,
        };

        if let Err(err) = &outcome {
            crate::obs::emit_run_failed(&model.name, &query.id, err);
        }

        let result = acc.finish(RunIdentity::new(model, query), start.elapsed(), outcome);

        METRICS.record_run(result.success);
        crate::obs::emit_run_finished(
            &result.model_name,
            &result.query_id,
            result.response_time_sec,
            result.iterations_used,
            result.success,
        );
        result
    }
}

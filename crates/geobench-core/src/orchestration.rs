//! Batch orchestration: every enabled model against every query.
//!
//! Pairs are visited model-major (models outer, queries inner). With
//! `concurrency == 1` they run strictly one after another; with more, up to
//! `concurrency` pairs are in flight but results are reassembled in the same
//! model-major order before the snapshot is written.
//!
//! A failed pair is just a failed [`RunResult`]; it never stops the batch.
//! Only a snapshot write failure is fatal.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::agent::AgentProvider;
use crate::config::BenchConfig;
use crate::domain::{ModelConfig, Query, Result, RunResult};
use crate::metrics::METRICS;
use crate::recording::RunRecorder;
use crate::snapshot::{PersistedSnapshot, SnapshotStore};

/// Everything one batch produced.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    /// Run Results in model-major invocation order.
    pub results: Vec<RunResult>,
    pub snapshot: PersistedSnapshot,
}

impl BatchOutcome {
    pub fn failed_runs(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

/// Runs batches and persists each one as an experiment snapshot.
pub struct BatchOrchestrator {
    recorder: RunRecorder,
    store: SnapshotStore,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(recorder: RunRecorder, store: SnapshotStore) -> Self {
        Self {
            recorder,
            store,
            concurrency: 1,
        }
    }

    /// Build recorder and store from runtime settings.
    pub fn from_config(provider: Arc<dyn AgentProvider>, config: &BenchConfig) -> Self {
        let mut recorder = RunRecorder::new(provider);
        if let Some(timeout) = config.run_timeout {
            recorder = recorder.with_run_timeout(timeout);
        }
        Self::new(recorder, SnapshotStore::new(config.results_dir.clone()))
            .with_concurrency(config.concurrency)
    }

    /// Allow up to `concurrency` pairs in flight (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run every enabled model on every query and persist the results.
    pub async fn run_batch(&self, models: &[ModelConfig], queries: &[Query]) -> Result<BatchOutcome> {
        let batch_id = Uuid::new_v4();
        let span = crate::obs::batch_span(&batch_id.to_string());
        self.run_batch_inner(batch_id, models, queries)
            .instrument(span)
            .await
    }

    async fn run_batch_inner(
        &self,
        batch_id: Uuid,
        models: &[ModelConfig],
        queries: &[Query],
    ) -> Result<BatchOutcome> {
        let start = Instant::now();
        let enabled: Vec<&ModelConfig> = models.iter().filter(|m| m.enabled).collect();
        crate::obs::emit_batch_started(&batch_id.to_string(), enabled.len(), queries.len());

        let pairs: Vec<(&ModelConfig, &Query)> = enabled
            .iter()
            .flat_map(|m| queries.iter().map(move |q| (*m, q)))
            .collect();
        let total = pairs.len();

        let results: Vec<RunResult> = if self.concurrency == 1 {
            let mut results = Vec::with_capacity(total);
            for (idx, (model, query)) in pairs.into_iter().enumerate() {
                info!("[{}/{}] model={} query={}", idx + 1, total, model.name, query.id);
                results.push(self.recorder.record_run(model, query).await);
            }
            results
        } else {
            info!(concurrency = self.concurrency, pairs = total, "running pairs concurrently");
            // `buffered` yields in input order regardless of completion order.
            stream::iter(pairs)
                .map(|(model, query)| self.recorder.record_run(model, query))
                .buffered(self.concurrency)
                .collect()
                .await
        };

        let snapshot = self.store.write(&results)?;
        let outcome = BatchOutcome {
            batch_id,
            results,
            snapshot,
        };

        crate::obs::emit_batch_finished(
            &batch_id.to_string(),
            outcome.results.len(),
            outcome.failed_runs(),
            start.elapsed().as_millis() as u64,
        );
        METRICS.flush();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptStep, ScriptedAgent};
    use crate::snapshot::read_snapshot;

    fn queries() -> Vec<Query> {
        vec![
            Query::new("q1", "Flood risk near Chennai?"),
            Query::new("q2", "Road closures in Shimla?"),
            Query::new("q3", "Compare rainfall Pune vs Mumbai"),
        ]
    }

    #[tokio::test]
    async fn test_two_models_three_queries_gives_six_results_model_major() {
        let dir = tempfile::tempdir().unwrap();
        let agent = ScriptedAgent::new()
            .with_default(ScriptedAgent::answering("risk", 2, "geospatial_reasoning"))
            .with_script(
                "b:1",
                "Road closures in Shimla?",
                vec![ScriptStep::Fail("connection reset".to_string())],
            );
        let orchestrator = BatchOrchestrator::new(
            RunRecorder::new(Arc::new(agent)),
            SnapshotStore::new(dir.path()),
        );
        let models = vec![
            ModelConfig::new("a", "a:1"),
            ModelConfig::new("skipped", "s:1").disabled(),
            ModelConfig::new("b", "b:1"),
        ];

        let outcome = orchestrator.run_batch(&models, &queries()).await.unwrap();

        let order: Vec<_> = outcome
            .results
            .iter()
            .map(|r| (r.model_name.as_str(), r.query_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a", "q1"),
                ("a", "q2"),
                ("a", "q3"),
                ("b", "q1"),
                ("b", "q2"),
                ("b", "q3"),
            ]
        );
        assert_eq!(outcome.failed_runs(), 1);
        assert!(!outcome.results[4].success);

        let persisted = read_snapshot(&outcome.snapshot.snapshot.path).unwrap();
        assert_eq!(persisted, outcome.results);
    }

    #[tokio::test]
    async fn test_all_failures_still_write_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let agent = ScriptedAgent::new().with_default(vec![ScriptStep::Fail("down".to_string())]);
        let orchestrator = BatchOrchestrator::new(
            RunRecorder::new(Arc::new(agent)),
            SnapshotStore::new(dir.path()),
        );

        let outcome = orchestrator
            .run_batch(&[ModelConfig::new("a", "a:1")], &queries())
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.failed_runs(), 3);
        assert!(outcome.snapshot.snapshot.path.exists());
    }

    #[tokio::test]
    async fn test_no_enabled_models_writes_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = BatchOrchestrator::new(
            RunRecorder::new(Arc::new(ScriptedAgent::new())),
            SnapshotStore::new(dir.path()),
        );

        let outcome = orchestrator
            .run_batch(&[ModelConfig::new("a", "a:1").disabled()], &queries())
            .await
            .unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.snapshot.runs, 0);
    }

    #[tokio::test]
    async fn test_concurrent_batch_keeps_model_major_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut slow_first = vec![ScriptStep::Delay(std::time::Duration::from_millis(80))];
        slow_first.extend(ScriptedAgent::answering("weather", 1, "a"));
        let agent = ScriptedAgent::new()
            .with_default(ScriptedAgent::answering("road", 1, "a"))
            .with_script("a:1", "Flood risk near Chennai?", slow_first);
        let orchestrator = BatchOrchestrator::new(
            RunRecorder::new(Arc::new(agent)),
            SnapshotStore::new(dir.path()),
        )
        .with_concurrency(4);

        let models = vec![ModelConfig::new("a", "a:1"), ModelConfig::new("b", "b:1")];
        let outcome = orchestrator.run_batch(&models, &queries()).await.unwrap();

        assert_eq!(outcome.results.len(), 6);
        assert_eq!(outcome.results[0].query_id, "q1");
        assert_eq!(outcome.results[0].classified_intent, "weather");
        assert_eq!(outcome.results[5].model_name, "b");
        assert_eq!(outcome.results[5].query_id, "q3");
    }

    #[test]
    fn test_from_config_clamps_concurrency() {
        let config = BenchConfig {
            concurrency: 0,
            ..BenchConfig::default()
        };
        let orchestrator = BatchOrchestrator::from_config(Arc::new(ScriptedAgent::new()), &config);
        assert_eq!(orchestrator.concurrency, 1);
        assert_eq!(orchestrator.store().dir(), config.results_dir.as_path());
    }
}

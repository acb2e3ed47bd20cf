//! Observability smoke tests for batch and run lifecycle tracing.

use std::sync::Arc;

use geobench_core::fakes::ScriptedAgent;
use geobench_core::{
    emit_batch_finished, emit_batch_started, emit_run_failed, emit_run_finished,
    emit_run_started, emit_snapshot_written, run_span, ModelConfig, Query, RunRecorder, METRICS,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_batch_lifecycle_events() {
    emit_batch_started("batch-1", 2, 3);
    emit_batch_finished("batch-1", 6, 1, 1200);

    assert!(logs_contain("batch.started"));
    assert!(logs_contain("batch.finished"));
}

#[traced_test]
#[test]
fn test_emit_run_events() {
    emit_run_started("llama", "q1");
    emit_run_finished("llama", "q1", 1.25, 3, true);

    assert!(logs_contain("run.started"));
    assert!(logs_contain("run.finished"));
}

/// Failures are logged at warn level.
#[traced_test]
#[test]
fn test_emit_run_failed_logs_warning() {
    emit_run_failed("qwen", "q2", &"connection refused");
    assert!(logs_contain("WARN"));
    assert!(logs_contain("connection refused"));
}

#[traced_test]
#[test]
fn test_emit_snapshot_written() {
    emit_snapshot_written("data/results/experiment_results_20260101_000000.json", 4, "ab12");
    assert!(logs_contain("snapshot.written"));
}

#[traced_test]
#[test]
fn test_run_span_enter() {
    let _span = run_span("llama", "q1").entered();
    tracing::info!("inside run");
    assert!(logs_contain("geobench.run"));
}

#[traced_test]
#[tokio::test]
async fn test_record_run_emits_events_and_counts() {
    let before = METRICS.runs_recorded();
    let agent = ScriptedAgent::new().with_default(ScriptedAgent::answering("road", 1, "route"));
    let recorder = RunRecorder::new(Arc::new(agent));

    let result = recorder
        .record_run(&ModelConfig::new("llama", "llama3.1:8b"), &Query::new("q1", "Roads?"))
        .await;

    assert!(result.success);
    assert!(METRICS.runs_recorded() > before);
    assert!(logs_contain("run.finished"));
}

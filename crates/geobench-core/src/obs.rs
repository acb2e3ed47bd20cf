//! Structured observability hooks for GeoBench batch and run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via [`run_span`]
//! - Emission functions for key lifecycle events: batch start, run start,
//!   run finish, snapshot written, batch finish
//!
//! Events are emitted at `info!` level (failures at `warn!`); filter with
//! `RUST_LOG` and switch to JSON lines with the CLI's `--json` flag.

use tracing::{info, warn};

/// Span tagging every log line of one (model, query) run.
pub fn run_span(model_name: &str, query_id: &str) -> tracing::Span {
    tracing::info_span!("geobench.run", model = %model_name, query = %query_id)
}

/// Span tagging every log line of one batch.
pub fn batch_span(batch_id: &str) -> tracing::Span {
    tracing::info_span!("geobench.batch", batch_id = %batch_id)
}

/// Emit event: batch started with its pair count.
pub fn emit_batch_started(batch_id: &str, models: usize, queries: usize) {
    info!(
        event = "batch.started",
        batch_id = %batch_id,
        models = models,
        queries = queries,
        pairs = models * queries,
    );
}

/// Emit event: a single run started.
///
/// # Example
///
/// ```ignore
/// emit_run_started("llama", "q3");
/// // logs: event=run.started model=llama query=q3
/// ```
pub fn emit_run_started(model_name: &str, query_id: &str) {
    info!(event = "run.started", model = %model_name, query = %query_id);
}

/// Emit event: run finished with duration, iterations and outcome.
pub fn emit_run_finished(
    model_name: &str,
    query_id: &str,
    response_time_sec: f64,
    iterations: u32,
    success: bool,
) {
    info!(
        event = "run.finished",
        model = %model_name,
        query = %query_id,
        response_time_sec = response_time_sec,
        iterations = iterations,
        success = success,
    );
}

/// Emit event: run failed (warning level). The run is still recorded.
pub fn emit_run_failed(model_name: &str, query_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "run.failed", model = %model_name, query = %query_id, error = %error);
}

/// Emit event: snapshot persisted.
pub fn emit_snapshot_written(path: &str, runs: usize, digest: &str) {
    info!(event = "snapshot.written", path = %path, runs = runs, digest = %digest);
}

/// Emit event: batch finished with success/failure tallies.
pub fn emit_batch_finished(batch_id: &str, runs: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "batch.finished",
        batch_id = %batch_id,
        runs = runs,
        failed = failed,
        duration_ms = duration_ms,
    );
}

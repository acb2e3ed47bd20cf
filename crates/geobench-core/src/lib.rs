//! GeoBench Core Library
//!
//! Records GIS agent runs, orchestrates model × query batches, persists
//! experiment snapshots, and scores models with a weighted composite.

pub mod agent;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod orchestration;
pub mod recording;
pub mod report;
pub mod scoring;
pub mod snapshot;
pub mod telemetry;

pub use agent::{AgentEventStream, AgentProvider};
pub use config::{
    enabled_models, load_models, load_queries, parse_models, parse_queries, BenchConfig,
    DEFAULT_RESULTS_DIR, DEFAULT_RUN_TIMEOUT_SECS,
};
pub use domain::{
    tool_usage, AgentError, AgentEvent, AgentSettings, BenchError, ModelConfig, Query, Result,
    RunIdentity, RunMeasurements, RunResult, TraceStep, ValidationError, UNKNOWN_INTENT,
};
pub use orchestration::{BatchOrchestrator, BatchOutcome};
pub use recording::RunRecorder;
pub use report::{
    find_trace, intent_distribution, query_comparison, render_report_md, write_report_md,
};
pub use scoring::{
    appearance_order, best_model, composite_score, round_half_up, score, score_with_policy,
    ModelStats, ScoreWeights, ScoringPolicy,
};
pub use snapshot::{read_snapshot, PersistedSnapshot, SnapshotRef, SnapshotStore};

pub use metrics::METRICS;
pub use obs::{
    batch_span, emit_batch_finished, emit_batch_started, emit_run_failed, emit_run_finished,
    emit_run_started, emit_snapshot_written, run_span,
};
pub use telemetry::init_tracing;

/// GeoBench version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

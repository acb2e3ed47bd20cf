//! Domain-level error taxonomy for GeoBench.

use std::path::PathBuf;

/// Errors produced when a Run Result breaks its invariants.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("run {model}/{query}: failed run must carry an error message")]
    FailedWithoutError { model: String, query: String },

    #[error("run {model}/{query}: successful run must not carry an error message")]
    SucceededWithError { model: String, query: String },

    #[error("run {model}/{query}: failed run must not carry trace steps")]
    FailedWithTrace { model: String, query: String },

    #[error("run {model}/{query}: negative response time {value}")]
    NegativeResponseTime {
        model: String,
        query: String,
        value: f64,
    },

    #[error("run {model}/{query}: tool_calls {recorded} does not match trace ({derived})")]
    ToolCallMismatch {
        model: String,
        query: String,
        recorded: u32,
        derived: u32,
    },
}

/// Failure raised while driving an agent event stream.
///
/// These never escape the run recorder; they become the `error` string of a
/// failed Run Result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("completion service error: {0}")]
    Service(String),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("run timed out after {secs} seconds")]
    Timeout { secs: f64 },

    #[error("agent stream failed: {0}")]
    Stream(String),
}

/// GeoBench domain errors.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(PathBuf),

    #[error("no snapshots in {0}")]
    NoSnapshots(PathBuf),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for GeoBench domain operations.
pub type Result<T> = std::result::Result<T, BenchError>;

//! Domain models for GeoBench.
//!
//! Canonical definitions for the core entities:
//! - `Query`: One GIS query of the benchmark battery
//! - `ModelConfig`: A model under test and its agent settings
//! - `AgentEvent` / `TraceStep`: What an agent emits while answering
//! - `RunResult`: Immutable record of one model answering one query

pub mod error;
pub mod event;
pub mod model;
pub mod query;
pub mod run_result;

// Re-export main types and errors
pub use error::{AgentError, BenchError, Result, ValidationError};
pub use event::{AgentEvent, TraceStep, UNKNOWN_INTENT};
pub use model::{AgentSettings, ModelConfig};
pub use query::Query;
pub use run_result::{tool_usage, RunIdentity, RunMeasurements, RunResult};

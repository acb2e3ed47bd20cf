//! The immutable record of one model executing one query.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::ValidationError;
use super::event::{TraceStep, UNKNOWN_INTENT};
use super::model::ModelConfig;
use super::query::Query;

/// Identity of a (model, query) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    pub model_name: String,
    pub model_identifier: String,
    pub query_id: String,
    pub query_text: String,
}

impl RunIdentity {
    pub fn new(model: &ModelConfig, query: &Query) -> Self {
        Self {
            model_name: model.name.clone(),
            model_identifier: model.model_identifier.clone(),
            query_id: query.id.clone(),
            query_text: query.text.clone(),
        }
    }
}

/// Measurements captured while driving a run, independent of its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMeasurements {
    /// Label from the last `intent_classification` event, if any arrived.
    pub classified_intent: Option<String>,
    pub response_time_sec: f64,
    pub iterations_used: u32,
}

/// One row of an experiment snapshot.
///
/// Build through [`RunResult::completed`] or [`RunResult::failed`]; both keep
/// the success/error/trace invariants and derive the tool usage fields from
/// the trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub model_name: String,

    #[serde(rename = "model_id", alias = "model_identifier")]
    pub model_identifier: String,

    pub query_id: String,

    #[serde(default)]
    pub query_text: String,

    /// Intent label, or `"unknown"`.
    pub classified_intent: String,

    /// Whether the agent emitted an intent classification at all. An
    /// explicit `"unknown"` and a missing classification score the same.
    #[serde(default)]
    pub intent_classified: bool,

    pub response_time_sec: f64,
    pub iterations_used: u32,
    pub tool_calls: u32,
    pub tools_used: BTreeSet<String>,
    pub success: bool,
    pub error: Option<String>,

    /// Capture time. Rows without an offset are read as UTC.
    #[serde(deserialize_with = "deserialize_utc")]
    pub timestamp: DateTime<Utc>,

    pub iteration_details: Vec<TraceStep>,
}

impl RunResult {
    /// A run whose stream reached its final answer.
    pub fn completed(
        identity: RunIdentity,
        measurements: RunMeasurements,
        iteration_details: Vec<TraceStep>,
    ) -> Self {
        Self::build(identity, measurements, iteration_details, None)
    }

    /// A run whose stream failed. Any partial trace is dropped.
    pub fn failed(
        identity: RunIdentity,
        measurements: RunMeasurements,
        error: impl Into<String>,
    ) -> Self {
        Self::build(identity, measurements, Vec::new(), Some(error.into()))
    }

    fn build(
        identity: RunIdentity,
        measurements: RunMeasurements,
        iteration_details: Vec<TraceStep>,
        error: Option<String>,
    ) -> Self {
        let (tool_calls, tools_used) = tool_usage(&iteration_details);
        let intent_classified = measurements.classified_intent.is_some();
        Self {
            model_name: identity.model_name,
            model_identifier: identity.model_identifier,
            query_id: identity.query_id,
            query_text: identity.query_text,
            classified_intent: measurements
                .classified_intent
                .unwrap_or_else(|| UNKNOWN_INTENT.to_string()),
            intent_classified,
            response_time_sec: round_millis(measurements.response_time_sec),
            iterations_used: measurements.iterations_used,
            tool_calls,
            tools_used,
            success: error.is_none(),
            error,
            timestamp: Utc::now(),
            iteration_details,
        }
    }

    /// Whether the intent resolved to something other than `"unknown"`.
    pub fn intent_known(&self) -> bool {
        self.classified_intent != UNKNOWN_INTENT
    }

    /// Check the record invariants. Used on snapshots read from disk.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let model = self.model_name.clone();
        let query = self.query_id.clone();

        if self.success && self.error.is_some() {
            return Err(ValidationError::SucceededWithError { model, query });
        }
        if !self.success {
            if self.error.is_none() {
                return Err(ValidationError::FailedWithoutError { model, query });
            }
            if !self.iteration_details.is_empty() {
                return Err(ValidationError::FailedWithTrace { model, query });
            }
        }
        if self.response_time_sec < 0.0 || self.response_time_sec.is_nan() {
            return Err(ValidationError::NegativeResponseTime {
                model,
                query,
                value: self.response_time_sec,
            });
        }
        let (derived, _) = tool_usage(&self.iteration_details);
        if derived != self.tool_calls {
            return Err(ValidationError::ToolCallMismatch {
                model,
                query,
                recorded: self.tool_calls,
                derived,
            });
        }
        Ok(())
    }
}

/// Count steps with a non-empty action and collect the distinct actions.
pub fn tool_usage(steps: &[TraceStep]) -> (u32, BTreeSet<String>) {
    let mut calls = 0u32;
    let mut tools = BTreeSet::new();
    for step in steps.iter().filter(|s| s.has_action()) {
        calls += 1;
        tools.insert(step.action.clone());
    }
    (calls, tools)
}

/// Accept RFC 3339, or a naive ISO-8601 date-time taken as UTC.
fn deserialize_utc<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
}

fn round_millis(secs: f64) -> f64 {
    ((secs.max(0.0)) * 1000.0).round() / 1000.0
}

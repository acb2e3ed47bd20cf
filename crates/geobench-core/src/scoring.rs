//! Per-model aggregation and weighted composite scoring.
//!
//! [`score`] is a pure function of `(results, weights)`: no I/O, no shared
//! state. Weights are expected to sum to 1.0; callers that let users pick
//! arbitrary weights normalize them first with [`ScoreWeights::normalized`].
//! The scorer itself does not enforce normalization.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::RunResult;

/// Weights of the four composite sub-scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    pub success: f64,
    pub intent: f64,
    pub latency: f64,
    pub efficiency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            success: 0.4,
            intent: 0.3,
            latency: 0.2,
            efficiency: 0.1,
        }
    }
}

impl ScoreWeights {
    pub fn new(success: f64, intent: f64, latency: f64, efficiency: f64) -> Self {
        Self {
            success,
            intent,
            latency,
            efficiency,
        }
    }

    pub fn total(&self) -> f64 {
        self.success + self.intent + self.latency + self.efficiency
    }

    /// Scale the weights to sum to 1.0. A non-positive total is returned
    /// unchanged.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total <= 0.0 {
            return *self;
        }
        Self {
            success: self.success / total,
            intent: self.intent / total,
            latency: self.latency / total,
            efficiency: self.efficiency / total,
        }
    }
}

/// Saturation points of the latency and efficiency sub-scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoringPolicy {
    /// Average latency (seconds) at which the latency term reaches 0.
    pub latency_ceiling_sec: f64,
    /// Average iteration count at which the efficiency term reaches 0.
    pub iteration_ceiling: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            latency_ceiling_sec: 120.0,
            iteration_ceiling: 10.0,
        }
    }
}

/// Aggregate statistics and composite score for one model name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelStats {
    pub runs: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub avg_response_time: f64,
    pub avg_iterations: f64,
    pub avg_tool_calls: f64,
    pub intent_known_count: usize,
    pub final_score: f64,
}

impl ModelStats {
    pub fn success_rate(&self) -> f64 {
        self.success_count as f64 / self.runs as f64
    }

    pub fn intent_rate(&self) -> f64 {
        self.intent_known_count as f64 / self.runs as f64
    }
}

#[derive(Default)]
struct Totals {
    runs: usize,
    success_count: usize,
    intent_known_count: usize,
    response_time: f64,
    iterations: f64,
    tool_calls: f64,
}

/// Score `results` under `weights` with the default policy.
pub fn score(results: &[RunResult], weights: &ScoreWeights) -> BTreeMap<String, ModelStats> {
    score_with_policy(results, weights, &ScoringPolicy::default())
}

/// Score `results` under `weights` and an explicit saturation policy.
///
/// Results are grouped by `model_name`; distinct identifiers sharing one
/// display name are merged. Every group has at least one run.
pub fn score_with_policy(
    results: &[RunResult],
    weights: &ScoreWeights,
    policy: &ScoringPolicy,
) -> BTreeMap<String, ModelStats> {
    let mut groups: BTreeMap<String, Totals> = BTreeMap::new();
    for r in results {
        let t = groups.entry(r.model_name.clone()).or_default();
        t.runs += 1;
        if r.success {
            t.success_count += 1;
        }
        if r.intent_known() {
            t.intent_known_count += 1;
        }
        t.response_time += r.response_time_sec;
        t.iterations += f64::from(r.iterations_used);
        t.tool_calls += f64::from(r.tool_calls);
    }

    groups
        .into_iter()
        .map(|(model, t)| {
            let runs = t.runs as f64;
            let mut stats = ModelStats {
                runs: t.runs,
                success_count: t.success_count,
                failure_count: t.runs - t.success_count,
                avg_response_time: t.response_time / runs,
                avg_iterations: t.iterations / runs,
                avg_tool_calls: t.tool_calls / runs,
                intent_known_count: t.intent_known_count,
                final_score: 0.0,
            };
            stats.final_score = composite_score(&stats, weights, policy);
            (model, stats)
        })
        .collect()
}

/// Weighted combination of the four sub-scores, rounded to 3 places.
pub fn composite_score(stats: &ModelStats, weights: &ScoreWeights, policy: &ScoringPolicy) -> f64 {
    let latency = (1.0 - stats.avg_response_time / policy.latency_ceiling_sec).max(0.0);
    let efficiency = (1.0 - stats.avg_iterations / policy.iteration_ceiling).max(0.0);

    let score = weights.success * stats.success_rate()
        + weights.intent * stats.intent_rate()
        + weights.latency * latency
        + weights.efficiency * efficiency;

    round_half_up(score, 3)
}

/// Round half away from zero on the decimal value.
///
/// A scaled value within 1e-6 of a `.5` boundary counts as exactly halfway,
/// so binary representation error (0.5005 scales to 500.49999999999994) does
/// not decide the rounding direction.
pub fn round_half_up(value: f64, places: i32) -> f64 {
    const HALF_TOLERANCE: f64 = 1e-6;

    let factor = 10f64.powi(places);
    let scaled = value * factor;
    let floor = scaled.floor();
    let rounded = if (scaled - floor - 0.5).abs() < HALF_TOLERANCE {
        if scaled >= 0.0 {
            floor + 1.0
        } else {
            floor
        }
    } else {
        scaled.round()
    };
    rounded / factor
}

/// Model names in order of first appearance in `results`.
pub fn appearance_order(results: &[RunResult]) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    results
        .iter()
        .map(|r| r.model_name.as_str())
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Model with the highest score; ties go to the model that appears first
/// in `results`.
pub fn best_model<'a>(
    scores: &'a BTreeMap<String, ModelStats>,
    results: &[RunResult],
) -> Option<(&'a str, &'a ModelStats)> {
    let mut best: Option<(&'a str, &'a ModelStats)> = None;
    for name in appearance_order(results) {
        let Some((key, stats)) = scores.get_key_value(name) else {
            continue;
        };
        match best {
            Some((_, b)) if b.final_score >= stats.final_score => {}
            _ => best = Some((key.as_str(), stats)),
        }
    }
    best
}

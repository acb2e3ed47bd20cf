use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{RunResult, TraceStep};
use crate::scoring::{appearance_order, best_model, ModelStats, ScoreWeights};

/// Model name → intent label → number of runs with that label.
pub fn intent_distribution(results: &[RunResult]) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut dist: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for r in results {
        *dist
            .entry(r.model_name.clone())
            .or_default()
            .entry(r.classified_intent.clone())
            .or_default() += 1;
    }
    dist
}

/// All results for one query, in snapshot order.
pub fn query_comparison<'a>(results: &'a [RunResult], query_id: &str) -> Vec<&'a RunResult> {
    results.iter().filter(|r| r.query_id == query_id).collect()
}

/// Trace of the first run of `model_name` on `query_id`, if any.
pub fn find_trace<'a>(
    results: &'a [RunResult],
    model_name: &str,
    query_id: &str,
) -> Option<&'a [TraceStep]> {
    results
        .iter()
        .find(|r| r.model_name == model_name && r.query_id == query_id)
        .map(|r| r.iteration_details.as_slice())
}

/// Distinct query ids in first-seen order.
fn query_ids(results: &[RunResult]) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::new();
    for r in results {
        if !ids.contains(&r.query_id.as_str()) {
            ids.push(&r.query_id);
        }
    }
    ids
}

/// Render the Markdown benchmark report.
pub fn render_report_md(
    scores: &BTreeMap<String, ModelStats>,
    weights: &ScoreWeights,
    results: &[RunResult],
) -> String {
    let mut out = String::new();
    out.push_str("# GeoBench Report\n\n");
    out.push_str(&format!(
        "- runs: {}\n- models: {}\n- queries: {}\n\n",
        results.len(),
        scores.len(),
        query_ids(results).len()
    ));

    out.push_str("## Leaderboard\n");
    if scores.is_empty() {
        out.push_str("No runs recorded.\n\n");
    } else {
        let mut ranked: Vec<(&str, &ModelStats)> = appearance_order(results)
            .into_iter()
            .filter_map(|name| scores.get_key_value(name).map(|(k, s)| (k.as_str(), s)))
            .collect();
        // Stable sort keeps first-appearance order for equal scores.
        ranked.sort_by(|a, b| b.1.final_score.total_cmp(&a.1.final_score));

        out.push_str("| rank | model | score | success | intent | avg time (s) | avg iterations | runs |\n");
        out.push_str("|---|---|---|---|---|---|---|---|\n");
        for (rank, (name, s)) in ranked.iter().enumerate() {
            out.push_str(&format!(
                "| {} | {} | {:.3} | {:.0}% | {:.0}% | {:.2} | {:.1} | {} |\n",
                rank + 1,
                name,
                s.final_score,
                s.success_rate() * 100.0,
                s.intent_rate() * 100.0,
                s.avg_response_time,
                s.avg_iterations,
                s.runs
            ));
        }
        out.push('\n');
    }

    if let Some((name, stats)) = best_model(scores, results) {
        out.push_str(&format!(
            "**Best model:** `{}` ({:.3})\n\n",
            name, stats.final_score
        ));
    }

    out.push_str("## Weights\n");
    out.push_str(&format!(
        "- success: {:.2}\n- intent: {:.2}\n- latency: {:.2}\n- efficiency: {:.2}\n\n",
        weights.success, weights.intent, weights.latency, weights.efficiency
    ));

    let dist = intent_distribution(results);
    if !dist.is_empty() {
        out.push_str("## Intent Distribution\n");
        for (model, intents) in &dist {
            let parts: Vec<String> = intents
                .iter()
                .map(|(intent, n)| format!("{} {}", intent, n))
                .collect();
            out.push_str(&format!("- `{}`: {}\n", model, parts.join(", ")));
        }
        out.push('\n');
    }

    for query_id in query_ids(results) {
        let rows = query_comparison(results, query_id);
        out.push_str(&format!("### Query `{}`\n", query_id));
        if let Some(first) = rows.first() {
            if !first.query_text.is_empty() {
                out.push_str(&format!("> {}\n\n", first.query_text));
            }
        }
        for r in rows {
            let status = match &r.error {
                None => "ok".to_string(),
                Some(e) => format!("failed: {}", e),
            };
            out.push_str(&format!(
                "- `{}`: {} | intent {} | {:.2}s | {} iterations | {} tool calls\n",
                r.model_name,
                status,
                r.classified_intent,
                r.response_time_sec,
                r.iterations_used,
                r.tool_calls
            ));
        }
        out.push('\n');
    }
    out
}

/// Write the Markdown report.
pub fn write_report_md(
    path: &Path,
    scores: &BTreeMap<String, ModelStats>,
    weights: &ScoreWeights,
    results: &[RunResult],
) -> Result<()> {
    let md = render_report_md(scores, weights, results);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

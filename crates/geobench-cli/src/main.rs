//! GeoBench CLI
//!
//! The `geobench` command runs GIS query batteries against local models and
//! compares the recorded runs.
//!
//! ## Commands
//!
//! - `run`: Run every enabled model on every query and write a snapshot
//! - `list`: List experiment snapshots, newest first
//! - `score`: Score a snapshot under custom weights
//! - `report`: Render a Markdown report for a snapshot
//! - `trace`: Show the recorded reasoning trace of one run

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

use geobench_agent::{
    GeoReasoningAgent, IntentParsing, OllamaClient, OllamaConfig, DEFAULT_OLLAMA_URL,
};
use geobench_core::{
    appearance_order, best_model, find_trace, load_models, load_queries, query_comparison,
    render_report_md, score, write_report_md, BatchOrchestrator, BenchConfig, ModelStats, RunResult,
    ScoreWeights, SnapshotStore, DEFAULT_RESULTS_DIR, DEFAULT_RUN_TIMEOUT_SECS,
};

#[derive(Parser)]
#[command(name = "geobench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark LLM-backed GIS agents across models and queries", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding experiment snapshots
    #[arg(long, global = true, env = "GEOBENCH_RESULTS_DIR", default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark batch and write a snapshot
    Run {
        /// Models file (YAML)
        #[arg(long, default_value = "config/models.yaml")]
        models: PathBuf,

        /// Queries file (JSON)
        #[arg(long, default_value = "data/queries.json")]
        queries: PathBuf,

        /// Maximum runs in flight
        #[arg(long, env = "GEOBENCH_CONCURRENCY", default_value_t = 1)]
        concurrency: usize,

        /// Per-run deadline in seconds (0 disables it)
        #[arg(long, env = "GEOBENCH_RUN_TIMEOUT_SECS", default_value_t = DEFAULT_RUN_TIMEOUT_SECS)]
        run_timeout_secs: u64,

        /// Ollama base URL
        #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_URL)]
        ollama_url: String,

        /// Accept intent JSON embedded in prose, ignoring label case
        #[arg(long)]
        lenient_intent: bool,
    },

    /// List experiment snapshots, newest first
    List,

    /// Score a snapshot (latest by default)
    Score {
        /// Snapshot file
        snapshot: Option<PathBuf>,

        #[command(flatten)]
        weights: WeightArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Render a Markdown report for a snapshot (latest by default)
    Report {
        /// Snapshot file
        snapshot: Option<PathBuf>,

        #[command(flatten)]
        weights: WeightArgs,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the recorded trace of one (model, query) run
    Trace {
        /// Model display name
        #[arg(long)]
        model: String,

        /// Query id
        #[arg(long)]
        query: String,

        /// Snapshot file
        snapshot: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Raw weights; normalized to sum to 1.0 before scoring.
#[derive(Args, Debug, Clone, Copy)]
struct WeightArgs {
    /// Success rate weight
    #[arg(long, default_value_t = 0.4)]
    success: f64,

    /// Intent accuracy weight
    #[arg(long, default_value_t = 0.3)]
    intent: f64,

    /// Latency weight
    #[arg(long, default_value_t = 0.2)]
    latency: f64,

    /// Efficiency weight
    #[arg(long, default_value_t = 0.1)]
    efficiency: f64,
}

impl WeightArgs {
    fn to_weights(self) -> Result<ScoreWeights> {
        let raw = ScoreWeights::new(self.success, self.intent, self.latency, self.efficiency);
        if [raw.success, raw.intent, raw.latency, raw.efficiency]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            bail!("weights must be finite and non-negative");
        }
        if raw.total() <= 0.0 {
            bail!("at least one weight must be positive");
        }
        Ok(raw.normalized())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    geobench_core::init_tracing(cli.json, level);

    let store = SnapshotStore::new(cli.results_dir.clone());

    match cli.command {
        Commands::Run {
            models,
            queries,
            concurrency,
            run_timeout_secs,
            ollama_url,
            lenient_intent,
        } => {
            let config = BenchConfig {
                results_dir: cli.results_dir,
                concurrency,
                run_timeout: (run_timeout_secs > 0).then(|| Duration::from_secs(run_timeout_secs)),
            };
            let parsing = if lenient_intent {
                IntentParsing::Lenient
            } else {
                IntentParsing::Strict
            };
            cmd_run(&config, &models, &queries, &ollama_url, parsing).await
        }
        Commands::List => cmd_list(&store),
        Commands::Score {
            snapshot,
            weights,
            format,
        } => cmd_score(&store, snapshot.as_deref(), weights.to_weights()?, format),
        Commands::Report {
            snapshot,
            weights,
            output,
        } => cmd_report(
            &store,
            snapshot.as_deref(),
            weights.to_weights()?,
            output.as_deref(),
        ),
        Commands::Trace {
            model,
            query,
            snapshot,
        } => cmd_trace(&store, snapshot.as_deref(), &model, &query),
    }
}

/// Run a batch against Ollama
async fn cmd_run(
    config: &BenchConfig,
    models_path: &Path,
    queries_path: &Path,
    ollama_url: &str,
    parsing: IntentParsing,
) -> Result<()> {
    let models = load_models(models_path)
        .with_context(|| format!("Failed to load models from {:?}", models_path))?;
    let queries = load_queries(queries_path)
        .with_context(|| format!("Failed to load queries from {:?}", queries_path))?;

    let client = OllamaClient::new(OllamaConfig::new(ollama_url))
        .context("Failed to create Ollama client")?;
    let agent = GeoReasoningAgent::new(Arc::new(client)).with_intent_parsing(parsing);
    let orchestrator = BatchOrchestrator::from_config(Arc::new(agent), config);

    info!(
        models = models.iter().filter(|m| m.enabled).count(),
        queries = queries.len(),
        "starting batch"
    );
    let outcome = orchestrator
        .run_batch(&models, &queries)
        .await
        .context("Batch failed")?;

    println!("Snapshot: {}", outcome.snapshot.snapshot.path.display());
    println!(
        "Runs:     {} ({} failed)",
        outcome.results.len(),
        outcome.failed_runs()
    );
    println!();
    print!(
        "{}",
        render_leaderboard(
            &score(&outcome.results, &ScoreWeights::default()),
            &outcome.results
        )
    );
    Ok(())
}

/// List snapshots
fn cmd_list(store: &SnapshotStore) -> Result<()> {
    let snapshots = store.list()?;
    if snapshots.is_empty() {
        println!("No snapshots in {:?}", store.dir());
        return Ok(());
    }

    for snapshot in snapshots {
        let digest = store
            .recorded_digest(&snapshot)?
            .map(|d| d.chars().take(12).collect::<String>())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {}",
            snapshot.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            digest,
            snapshot.name
        );
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ScoreOutput<'a> {
    snapshot: &'a Path,
    weights: ScoreWeights,
    best_model: Option<&'a str>,
    scores: &'a BTreeMap<String, ModelStats>,
}

/// Score a snapshot
fn cmd_score(
    store: &SnapshotStore,
    snapshot: Option<&Path>,
    weights: ScoreWeights,
    format: OutputFormat,
) -> Result<()> {
    let (path, results) = load_snapshot(store, snapshot)?;
    let scores = score(&results, &weights);

    match format {
        OutputFormat::Json => {
            let output = ScoreOutput {
                snapshot: &path,
                weights,
                best_model: best_model(&scores, &results).map(|(name, _)| name),
                scores: &scores,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("Snapshot: {}", path.display());
            println!(
                "Weights:  success {:.2}, intent {:.2}, latency {:.2}, efficiency {:.2}",
                weights.success, weights.intent, weights.latency, weights.efficiency
            );
            println!();
            print!("{}", render_leaderboard(&scores, &results));
        }
    }
    Ok(())
}

/// Render a Markdown report
fn cmd_report(
    store: &SnapshotStore,
    snapshot: Option<&Path>,
    weights: ScoreWeights,
    output: Option<&Path>,
) -> Result<()> {
    let (_, results) = load_snapshot(store, snapshot)?;
    let scores = score(&results, &weights);

    match output {
        Some(out) => {
            write_report_md(out, &scores, &weights, &results)?;
            println!("Report written to {}", out.display());
        }
        None => print!("{}", render_report_md(&scores, &weights, &results)),
    }
    Ok(())
}

/// Show the recorded trace of one run
fn cmd_trace(store: &SnapshotStore, snapshot: Option<&Path>, model: &str, query: &str) -> Result<()> {
    let (_, results) = load_snapshot(store, snapshot)?;
    println!("{}", render_trace(&results, model, query)?);
    Ok(())
}

fn load_snapshot(store: &SnapshotStore, snapshot: Option<&Path>) -> Result<(PathBuf, Vec<RunResult>)> {
    store
        .load(snapshot)
        .with_context(|| match snapshot {
            Some(p) => format!("Failed to read snapshot {:?}", p),
            None => format!("Failed to read latest snapshot in {:?}", store.dir()),
        })
}

fn render_leaderboard(scores: &BTreeMap<String, ModelStats>, results: &[RunResult]) -> String {
    if scores.is_empty() {
        return "No runs recorded.\n".to_string();
    }

    let mut ranked: Vec<(&str, &ModelStats)> = appearance_order(results)
        .into_iter()
        .filter_map(|name| scores.get_key_value(name).map(|(k, s)| (k.as_str(), s)))
        .collect();
    ranked.sort_by(|a, b| b.1.final_score.total_cmp(&a.1.final_score));

    let mut out = format!(
        "{:<4} {:<24} {:>7} {:>8} {:>7} {:>9} {:>6}\n",
        "#", "MODEL", "SCORE", "SUCCESS", "INTENT", "AVG TIME", "ITERS"
    );
    for (rank, (name, s)) in ranked.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<24} {:>7.3} {:>7.0}% {:>6.0}% {:>8.2}s {:>6.1}\n",
            rank + 1,
            truncate(name, 24),
            s.final_score,
            s.success_rate() * 100.0,
            s.intent_rate() * 100.0,
            s.avg_response_time,
            s.avg_iterations
        ));
    }
    out
}

fn render_trace(results: &[RunResult], model: &str, query: &str) -> Result<String> {
    let Some(run) = query_comparison(results, query)
        .into_iter()
        .find(|r| r.model_name == model)
    else {
        bail!("No run of model '{}' on query '{}'", model, query);
    };
    let steps = find_trace(results, model, query).unwrap_or_default();

    let mut out = format!(
        "{} / {}: {}\nQuery:  {}\nIntent: {}\n",
        run.model_name,
        run.query_id,
        if run.success { "ok" } else { "failed" },
        run.query_text,
        run.classified_intent
    );
    if let Some(err) = &run.error {
        out.push_str(&format!("Error:  {}\n", err));
    }
    if steps.is_empty() {
        out.push_str("(no trace recorded)");
    }
    for step in steps {
        out.push_str(&format!(
            "\n[{}] {} ({})\n    {}",
            step.iteration, step.action, step.intent, step.observation
        ));
    }
    Ok(out)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use geobench_core::{ModelConfig, Query, RunIdentity, RunMeasurements, TraceStep};

    fn run(model: &str, query: &str, success: bool) -> RunResult {
        let identity = RunIdentity::new(
            &ModelConfig::new(model, format!("{}:7b", model)),
            &Query::new(query, "Landslide risk near Munnar?"),
        );
        let m = RunMeasurements {
            classified_intent: Some("risk".to_string()),
            response_time_sec: 4.0,
            iterations_used: 3,
        };
        if success {
            let step = TraceStep::new(1, "risk", "geospatial_reasoning", "Steep laterite slopes.");
            RunResult::completed(identity, m, vec![step])
        } else {
            RunResult::failed(identity, m, "run timed out after 300 seconds")
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_weights_are_normalized() {
        let args = WeightArgs {
            success: 2.0,
            intent: 1.0,
            latency: 1.0,
            efficiency: 0.0,
        };
        let w = args.to_weights().unwrap();
        assert_eq!(w.success, 0.5);
        assert_eq!(w.latency, 0.25);
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let zero = WeightArgs {
            success: 0.0,
            intent: 0.0,
            latency: 0.0,
            efficiency: 0.0,
        };
        assert!(zero.to_weights().is_err());

        let negative = WeightArgs {
            success: -1.0,
            intent: 1.0,
            latency: 1.0,
            efficiency: 1.0,
        };
        assert!(negative.to_weights().is_err());
    }

    #[test]
    fn test_parses_score_command() {
        let cli = Cli::try_parse_from([
            "geobench",
            "--results-dir",
            "/tmp/results",
            "score",
            "--success",
            "1",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.results_dir, PathBuf::from("/tmp/results"));
        match cli.command {
            Commands::Score { weights, format, .. } => {
                assert_eq!(weights.success, 1.0);
                assert_eq!(weights.intent, 0.3);
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected score command"),
        }
    }

    #[test]
    fn test_run_intent_parsing_is_strict_unless_asked() {
        let cli = Cli::try_parse_from(["geobench", "run"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                lenient_intent: false,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["geobench", "run", "--lenient-intent"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                lenient_intent: true,
                ..
            }
        ));
    }

    #[test]
    fn test_leaderboard_ranks_by_score() {
        let results = vec![run("slow", "q1", false), run("fast", "q1", true)];
        let board = render_leaderboard(&score(&results, &ScoreWeights::default()), &results);
        let lines: Vec<&str> = board.lines().collect();
        assert!(lines[1].contains("fast"));
        assert!(lines[2].contains("slow"));
    }

    #[test]
    fn test_leaderboard_ties_keep_first_appearance() {
        let results = vec![run("zeta", "q1", true), run("alpha", "q1", true)];
        let board = render_leaderboard(&score(&results, &ScoreWeights::default()), &results);
        let lines: Vec<&str> = board.lines().collect();
        assert!(lines[1].contains("zeta"));
        assert!(lines[2].contains("alpha"));
    }

    #[test]
    fn test_trace_shows_steps_and_errors() {
        let results = vec![run("llama", "q1", true), run("qwen", "q1", false)];

        let ok = render_trace(&results, "llama", "q1").unwrap();
        assert!(ok.contains("[1] geospatial_reasoning (risk)"));
        assert!(ok.contains("Steep laterite slopes."));

        let failed = render_trace(&results, "qwen", "q1").unwrap();
        assert!(failed.contains("Error:  run timed out after 300 seconds"));
        assert!(failed.contains("(no trace recorded)"));

        assert!(render_trace(&results, "mistral", "q1").is_err());
    }

    #[test]
    fn test_score_and_report_read_latest_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store
            .write(&[run("llama", "q1", true), run("qwen", "q1", false)])
            .unwrap();

        cmd_score(&store, None, ScoreWeights::default(), OutputFormat::Json).unwrap();

        let out = dir.path().join("report.md");
        cmd_report(&store, None, ScoreWeights::default(), Some(&out)).unwrap();
        assert!(std::fs::read_to_string(&out).unwrap().contains("# GeoBench Report"));
    }

    #[test]
    fn test_score_without_snapshots_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("empty"));
        assert!(cmd_score(&store, None, ScoreWeights::default(), OutputFormat::Text).is_err());
        cmd_list(&store).unwrap();
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-model-name", 10), "a-very-...");
    }
}

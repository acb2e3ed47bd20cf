//! End-to-end batch pipeline: orchestrate → snapshot → reload → score.

use std::sync::Arc;

use geobench_core::fakes::{ScriptStep, ScriptedAgent};
use geobench_core::{
    best_model, find_trace, parse_models, parse_queries, render_report_md, score,
    BatchOrchestrator, BenchConfig, ScoreWeights, SnapshotStore,
};

const MODELS: &str = r#"
models:
  - name: llama
    model_id: llama3.1:8b
    enabled: true
  - name: qwen
    model_id: qwen2.5:7b
    enabled: true
  - name: phi
    model_id: phi3:mini
    enabled: false
"#;

const QUERIES: &str = r#"[
  {"id": "q1", "query": "Which districts of Assam flood in July?"},
  {"id": "q2", "query": "Is NH-44 open near Srinagar?"}
]"#;

fn agent() -> ScriptedAgent {
    ScriptedAgent::new()
        .with_default(ScriptedAgent::answering("risk", 2, "geospatial_reasoning"))
        .with_script(
            "qwen2.5:7b",
            "Is NH-44 open near Srinagar?",
            vec![ScriptStep::Fail("ollama returned 503".to_string())],
        )
}

#[tokio::test]
async fn test_batch_snapshot_and_scores() {
    let dir = tempfile::tempdir().unwrap();
    let config = BenchConfig {
        results_dir: dir.path().to_path_buf(),
        ..BenchConfig::default()
    };
    let models = parse_models(MODELS).unwrap();
    let queries = parse_queries(QUERIES).unwrap();

    let orchestrator = BatchOrchestrator::from_config(Arc::new(agent()), &config);
    let outcome = orchestrator.run_batch(&models, &queries).await.unwrap();
    assert_eq!(outcome.results.len(), 4);
    assert_eq!(outcome.failed_runs(), 1);

    let store = SnapshotStore::new(dir.path());
    let latest = store.latest().unwrap().unwrap();
    assert_eq!(latest.path, outcome.snapshot.snapshot.path);

    let (path, reloaded) = store.load(None).unwrap();
    assert_eq!(path, latest.path);
    assert_eq!(reloaded, outcome.results);

    let scores = score(&reloaded, &ScoreWeights::default());
    assert_eq!(scores.len(), 2);
    assert_eq!(scores["llama"].success_count, 2);
    assert_eq!(scores["qwen"].failure_count, 1);
    assert!(scores["llama"].final_score > scores["qwen"].final_score);
    assert_eq!(best_model(&scores, &reloaded).unwrap().0, "llama");

    assert_eq!(find_trace(&reloaded, "llama", "q2").unwrap().len(), 2);
    assert!(find_trace(&reloaded, "qwen", "q2").unwrap().is_empty());

    let md = render_report_md(&scores, &ScoreWeights::default(), &reloaded);
    assert!(md.contains("ollama returned 503"));
}

#[tokio::test]
async fn test_two_batches_write_two_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let config = BenchConfig {
        results_dir: dir.path().to_path_buf(),
        concurrency: 3,
        ..BenchConfig::default()
    };
    let models = parse_models(MODELS).unwrap();
    let queries = parse_queries(QUERIES).unwrap();
    let orchestrator = BatchOrchestrator::from_config(Arc::new(agent()), &config);

    let first = orchestrator.run_batch(&models, &queries).await.unwrap();
    let second = orchestrator.run_batch(&models, &queries).await.unwrap();

    assert_ne!(first.snapshot.snapshot.path, second.snapshot.snapshot.path);
    let listed = orchestrator.store().list().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].path, second.snapshot.snapshot.path);
}

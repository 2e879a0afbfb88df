use std::sync::Arc;
use std::time::Duration;
use findings_gate::backend::{MemoryBackend, ResultsBackend};
use findings_gate::config::{BackendConfig, ScoreSettings, UploadConfig};
use findings_gate::models::{ArtifactStatus, FolderBucket, GroupingValue, ALL_BUCKET_ID};
use findings_gate::pipeline::UploadStep;
use findings_gate::summary::{BuildResult, JobHistory, Qualifier};
use findings_gate::trend::merge;
use findings_gate::GateError;
use tempfile::TempDir;

fn upload_config(results: &str) -> UploadConfig {
    UploadConfig {
        app_name: "billing".into(),
        app_version: "2.1".into(),
        results_file: results.to_string(),
        results_remote: true,
        filter_set: None,
        failure_condition: None,
        timeout: Duration::from_secs(5 * 60),
        poll_interval: Duration::from_secs(60),
    }
}

fn backend(high: u32) -> MemoryBackend {
    MemoryBackend::new()
        .with_statuses(vec![ArtifactStatus::RequireAuth, ArtifactStatus::Processing, ArtifactStatus::Complete])
        .with_bucket(FolderBucket::new("h", "High", high, 1))
        .with_bucket(FolderBucket::new("l", "Low", 10, 0))
        .with_grouping_values("h", "Analysis", None, vec![
            GroupingValue::new("1", "<none>", "h", high),
            GroupingValue::new("2", "Not an Issue", "h", 1),
        ])
        .with_grouping_values("l", "Analysis", None, vec![GroupingValue::new("1", "<none>", "l", 10)])
        .with_grouping_values(ALL_BUCKET_ID, "Analysis", None, vec![
            GroupingValue::new("3", "Exploitable", ALL_BUCKET_ID, 1),
        ])
}

async fn run(builds: &std::path::Path, results: &str, backend: MemoryBackend) -> Result<findings_gate::pipeline::BuildOutcome, GateError> {
    let backend: Arc<dyn ResultsBackend> = Arc::new(backend);
    UploadStep::new(
        backend,
        BackendConfig::new("https://ssc.test/ssc", "token"),
        upload_config(results),
        ScoreSettings::default(),
        builds,
    )
    .run()
    .await
}

#[tokio::test(start_paused = true)]
async fn test_two_builds_produce_a_trend() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("scan.fpr");
    tokio::fs::write(&results, b"fpr").await.unwrap();
    let builds = dir.path().join("builds");
    let results = results.to_string_lossy().into_owned();

    let first = run(&builds, &results, backend(5)).await.unwrap();
    let second = run(&builds, &results, backend(2)).await.unwrap();
    assert_eq!(first.result, BuildResult::Success);
    assert_eq!(second.build, 2);

    // (high 5 * 5 + low 10 * 0.1) * 0.5 + exploitable 1 * 64 * 0.5
    assert!((first.summary.score - 45.0).abs() < 1e-9);
    assert_eq!(first.summary.total_issues, 15);

    let history = JobHistory::new(&builds);
    let qualifier = Qualifier::new("billing", "2.1");
    let points = history.score_history(&qualifier).await.unwrap();
    assert_eq!(points.len(), 2);

    let current = history.summary_of(2, &qualifier).await.unwrap();
    let previous = history.summary_of(1, &qualifier).await.unwrap();
    let trend = merge(&current, Some(&previous));
    let high = trend.folder("High").unwrap();
    assert!(high.issues.has_prev());
    assert!(high.issues.is_more());
    assert!(trend.score.is_more());
}

#[tokio::test(start_paused = true)]
async fn test_missing_results_file_fails_before_upload() {
    let dir = TempDir::new().unwrap();
    let builds = dir.path().join("builds");
    let missing = dir.path().join("absent").to_string_lossy().into_owned();

    let err = run(&builds, &missing, backend(1)).await.unwrap_err();
    assert!(matches!(err, GateError::Config(_)));

    let record = findings_gate::summary::BuildRecord::load(&builds, 1).await.unwrap().unwrap();
    assert_eq!(record.result, Some(BuildResult::Failure));
}

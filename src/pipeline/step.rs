use std::path::PathBuf;
use std::sync::Arc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use crate::backend::ResultsBackend;
use crate::config::{BackendConfig, ScoreSettings, UploadConfig};
use crate::errors::GateError;
use crate::models::{normalize_results_path, ArtifactUpload, ResultsLocation};
use crate::scoring::ScoreAggregator;
use crate::summary::{BuildRecord, BuildResult, BuildSummary, JobHistory, Qualifier};
use crate::upload::UploadPoller;
use crate::utils::formatting::format_score;
use crate::utils::truncation::truncate_error;

/// What one upload step produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub build: u64,
    pub result: BuildResult,
    pub qualifier: Qualifier,
    pub summary: BuildSummary,
}

impl BuildOutcome {
    pub fn is_unstable(&self) -> bool {
        self.result == BuildResult::Unstable
    }
}

/// Upload, wait for processing, score, persist. Runs as one build.
pub struct UploadStep {
    backend: Arc<dyn ResultsBackend>,
    backend_config: BackendConfig,
    upload: UploadConfig,
    scoring: ScoreSettings,
    builds_dir: PathBuf,
    build_number: Option<u64>,
    cancel_token: CancellationToken,
}

impl UploadStep {
    pub fn new(
        backend: Arc<dyn ResultsBackend>,
        backend_config: BackendConfig,
        upload: UploadConfig,
        scoring: ScoreSettings,
        builds_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            backend_config,
            upload,
            scoring,
            builds_dir: builds_dir.into(),
            build_number: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Report into an existing build instead of starting the next one.
    pub fn with_build_number(mut self, number: u64) -> Self {
        self.build_number = Some(number);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub async fn run(&self) -> Result<BuildOutcome, GateError> {
        self.upload.validate()?;
        let history = JobHistory::new(&self.builds_dir);
        let mut record = match self.build_number {
            Some(n) => BuildRecord::load(&self.builds_dir, n).await?.unwrap_or_else(|| BuildRecord::new(n)),
            None => BuildRecord::new(history.next_build_number().await?),
        };
        let qualifier = Qualifier::new(&self.upload.app_name, &self.upload.app_version);
        record.add_report(&qualifier);
        record.save(&self.builds_dir).await?;
        info!(build = record.number, app = %self.upload.app_name, version = %self.upload.app_version, "Starting upload step");

        match self.execute(&mut record, &qualifier).await {
            Ok(summary) => {
                if summary.failed_count > 0 {
                    warn!(
                        failed_count = summary.failed_count,
                        "Issues match the failure condition, marking build unstable"
                    );
                    record.set_result(BuildResult::Unstable);
                }
                record.finish();
                record.save(&self.builds_dir).await?;
                Ok(BuildOutcome {
                    build: record.number,
                    result: record.result.unwrap_or(BuildResult::Success),
                    qualifier,
                    summary,
                })
            }
            Err(e) => {
                if !matches!(e, GateError::Timeout(_)) {
                    error!(build = record.number, error = %e, "Upload step failed");
                    record.set_result(BuildResult::Failure);
                    record.description = Some(truncate_error(&e.to_string()));
                }
                record.finish();
                if let Err(save_err) = record.save(&self.builds_dir).await {
                    warn!(error = %save_err, "Failed to save build record");
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, record: &mut BuildRecord, qualifier: &Qualifier) -> Result<BuildSummary, GateError> {
        let path = normalize_results_path(&self.upload.results_file)
            .ok_or_else(|| GateError::Config("Results file is not specified".into()))?;
        let location = if self.upload.results_remote {
            ResultsLocation::Remote(path)
        } else {
            ResultsLocation::Local(path)
        };
        let mut artifact = ArtifactUpload::new(location, &self.upload.app_name, &self.upload.app_version);

        let poller = UploadPoller::new(self.backend.clone(), self.backend_config.clone())
            .with_cancel_token(self.cancel_token.clone());
        let receipt = poller.upload(&mut artifact).await?;
        poller
            .await_processed(&receipt, self.upload.timeout, self.upload.poll_interval, record)
            .await?;

        let aggregator = ScoreAggregator::new(self.backend.clone(), self.scoring.clone());
        let mut summary = aggregator
            .aggregate(
                receipt.version_id,
                self.upload.filter_set.as_deref(),
                self.upload.failure_condition.as_deref(),
            )
            .await;
        summary.log = artifact.log.take();

        JobHistory::new(&self.builds_dir)
            .store()
            .save(record.number, qualifier, &summary)
            .await?;
        info!(
            build = record.number,
            score = %format_score(summary.score),
            total_issues = summary.total_issues,
            "Saved build summary"
        );
        Ok(summary)
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::backend::ResultsBackend;
use crate::config::{BackendConfig, DEFAULT_POLL_INTERVAL_MINUTES};
use crate::errors::{with_retry, GateError, RetryConfig};
use crate::models::{ArtifactId, ArtifactStatus, ArtifactUpload, ProjectId, ResultsLocation, VersionId};
use crate::summary::BuildRecord;
use crate::utils::formatting::format_duration;
use super::project::ensure_version;

/// Identifiers of a submitted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
    pub project_id: Option<ProjectId>,
    pub version_id: VersionId,
    pub artifact_id: ArtifactId,
}

pub struct UploadPoller {
    backend: Arc<dyn ResultsBackend>,
    config: BackendConfig,
    cancel_token: CancellationToken,
    retry: RetryConfig,
}

impl UploadPoller {
    pub fn new(backend: Arc<dyn ResultsBackend>, config: BackendConfig) -> Self {
        Self {
            backend,
            config,
            cancel_token: CancellationToken::new(),
            retry: RetryConfig::default(),
        }
    }

    /// Replace the poller's cancel token with an external one (e.g. Ctrl-C handler).
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve the results file, make sure the version exists and submit the file.
    pub async fn upload(&self, artifact: &mut ArtifactUpload) -> Result<UploadReceipt, GateError> {
        self.config.validate()?;
        if artifact.app_name.trim().is_empty() || artifact.app_version.trim().is_empty() {
            return Err(GateError::Config(format!(
                "Application name and version are required (name='{}', version='{}')",
                artifact.app_name, artifact.app_version
            )));
        }

        let staged = stage_results(artifact).await?;

        let result = self.submit(artifact, staged.path()).await;
        staged.cleanup();
        result
    }

    async fn submit(&self, artifact: &ArtifactUpload, file: &Path) -> Result<UploadReceipt, GateError> {
        let version_id = ensure_version(
            self.backend.as_ref(),
            &artifact.app_name,
            &artifact.app_version,
            self.config.issue_template.as_deref(),
        ).await?;
        let project_id = self.backend.resolve_project_id(&artifact.app_name).await?;

        info!(
            file = %file.display(),
            app = %artifact.app_name,
            version = %artifact.app_version,
            url = %self.config.url,
            "Uploading results file"
        );
        let artifact_id = self.backend.upload_artifact(version_id, file).await?;
        info!(%artifact_id, %version_id, "Results file uploaded");

        Ok(UploadReceipt { project_id, version_id, artifact_id })
    }

    /// Poll the artifact until the server finishes processing it.
    ///
    /// A zero `timeout` waits forever; a zero `poll_interval` uses the default.
    /// On timeout the build record is marked not built.
    pub async fn await_processed(
        &self,
        receipt: &UploadReceipt,
        timeout: Duration,
        poll_interval: Duration,
        record: &mut BuildRecord,
    ) -> Result<(), GateError> {
        let interval = if poll_interval.is_zero() {
            Duration::from_secs(DEFAULT_POLL_INTERVAL_MINUTES * 60)
        } else {
            poll_interval
        };
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let artifact_id = receipt.artifact_id;

        loop {
            let sleep_for = match deadline {
                Some(d) => interval.min(d.saturating_duration_since(Instant::now())),
                None => interval,
            };
            info!(%artifact_id, "Sleeping for {}", format_duration(sleep_for));
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    warn!(%artifact_id, "Polling cancelled; artifact keeps processing on the server");
                    return Err(GateError::Cancelled("Polling for artifact status was cancelled".into()));
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }

            let status = with_retry("artifact status", &self.retry, || {
                self.backend.artifact_status(artifact_id)
            }).await?;

            match status {
                ArtifactStatus::Complete => {
                    info!(%artifact_id, "Artifact processing complete");
                    return Ok(());
                }
                ArtifactStatus::Error => {
                    return Err(GateError::Processing(format!(
                        "Artifact {} failed processing on the server. Check {}",
                        artifact_id,
                        self.config.artifacts_url(receipt.version_id)
                    )));
                }
                ArtifactStatus::RequireAuth => {
                    info!(%artifact_id, "Artifact requires approval on the server, still waiting");
                }
                ArtifactStatus::Uploading | ArtifactStatus::Processing => {
                    debug!(%artifact_id, %status, "Artifact not processed yet");
                }
                ArtifactStatus::Other(name) => {
                    warn!(%artifact_id, status = %name, "Unexpected artifact status, continuing the build");
                    return Ok(());
                }
            }

            if let Some(d) = deadline {
                if Instant::now() >= d {
                    let minutes = timeout.as_secs() / 60;
                    let description = format!(
                        "A timeout has been reached when polling for the upload status. \
                         The build is marked as not completed. You can check the status here: {}",
                        self.config.artifacts_url(receipt.version_id)
                    );
                    warn!(%artifact_id, "{}", description);
                    record.mark_not_built(&description);
                    return Err(GateError::Timeout(format!(
                        "Timeout of {} minute(s) is reached.",
                        minutes
                    )));
                }
            }
        }
    }
}

/// Results file ready for upload. Remote files live in a private temp
/// directory that `cleanup` removes.
struct StagedResults {
    path: PathBuf,
    temp_dir: Option<tempfile::TempDir>,
}

impl StagedResults {
    fn path(&self) -> &Path {
        &self.path
    }

    fn cleanup(self) {
        if let Some(dir) = self.temp_dir {
            let dir_path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %dir_path.display(), error = %e, "Failed to remove temporary results copy");
            }
        }
    }
}

async fn stage_results(artifact: &mut ArtifactUpload) -> Result<StagedResults, GateError> {
    let source = artifact.results.path().to_path_buf();
    if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        return Err(GateError::Config(format!("Results file not found: {}", source.display())));
    }

    match &artifact.results {
        ResultsLocation::Local(_) => Ok(StagedResults { path: source, temp_dir: None }),
        ResultsLocation::Remote(_) => {
            let temp_dir = tempfile::Builder::new().prefix("findings-gate").tempdir()?;
            let file_name = source
                .file_name()
                .ok_or_else(|| GateError::Config(format!("Invalid results path: {}", source.display())))?;
            let local = temp_dir.path().join(file_name);
            tokio::fs::copy(&source, &local).await?;
            artifact.log(&format!("Copied {} to {}\n", source.display(), local.display()));
            debug!(from = %source.display(), to = %local.display(), "Copied remote results file");
            Ok(StagedResults { path: local, temp_dir: Some(temp_dir) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::summary::BuildResult;

    fn poller(backend: MemoryBackend) -> (UploadPoller, Arc<MemoryBackend>) {
        let backend = Arc::new(backend);
        let poller = UploadPoller::new(backend.clone(), BackendConfig::new("https://ssc.test/ssc", "tok"))
            .with_retry_config(RetryConfig::none());
        (poller, backend)
    }

    fn receipt() -> UploadReceipt {
        UploadReceipt { project_id: None, version_id: VersionId(5), artifact_id: ArtifactId(9) }
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_complete_after_processing() {
        let (poller, backend) = poller(MemoryBackend::new().with_statuses(vec![
            ArtifactStatus::Uploading,
            ArtifactStatus::Processing,
            ArtifactStatus::Complete,
        ]));
        let mut record = BuildRecord::new(1);
        poller.await_processed(&receipt(), Duration::ZERO, MINUTE, &mut record).await.unwrap();
        assert_eq!(backend.status_calls(), 3);
        assert!(record.result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_is_processing_error() {
        let (poller, _) = poller(MemoryBackend::new().with_statuses(vec![ArtifactStatus::Error]));
        let mut record = BuildRecord::new(1);
        let err = poller.await_processed(&receipt(), Duration::ZERO, MINUTE, &mut record).await.unwrap_err();
        assert!(matches!(err, GateError::Processing(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_auth_keeps_polling() {
        let (poller, backend) = poller(MemoryBackend::new().with_statuses(vec![
            ArtifactStatus::RequireAuth,
            ArtifactStatus::RequireAuth,
            ArtifactStatus::Complete,
        ]));
        let mut record = BuildRecord::new(1);
        poller.await_processed(&receipt(), Duration::ZERO, MINUTE, &mut record).await.unwrap();
        assert_eq!(backend.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_auth_counts_toward_timeout() {
        let (poller, _) = poller(MemoryBackend::new().with_statuses(vec![ArtifactStatus::RequireAuth]));
        let mut record = BuildRecord::new(1);
        let err = poller.await_processed(&receipt(), 2 * MINUTE, MINUTE, &mut record).await.unwrap_err();
        assert!(matches!(err, GateError::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_build_not_built() {
        let (poller, backend) = poller(MemoryBackend::new().with_statuses(vec![ArtifactStatus::Processing]));
        let mut record = BuildRecord::new(1);
        let started = Instant::now();
        let err = poller.await_processed(&receipt(), MINUTE, MINUTE, &mut record).await.unwrap_err();

        assert!(matches!(err, GateError::Timeout(_)));
        assert_eq!(err.to_string(), "Timeout: Timeout of 1 minute(s) is reached.");
        assert!(started.elapsed() <= MINUTE + Duration::from_secs(1));
        assert_eq!(backend.status_calls(), 1);
        assert_eq!(record.result, Some(BuildResult::NotBuilt));
        assert!(record
            .description
            .as_deref()
            .unwrap()
            .contains("https://ssc.test/ssc/html/ssc/version/5/artifacts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_capped_by_deadline() {
        let (poller, backend) = poller(MemoryBackend::new().with_statuses(vec![ArtifactStatus::Processing]));
        let mut record = BuildRecord::new(1);
        let started = Instant::now();
        poller.await_processed(&receipt(), MINUTE, 10 * MINUTE, &mut record).await.unwrap_err();
        assert!(started.elapsed() < 2 * MINUTE);
        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_uses_default() {
        let (poller, _) = poller(MemoryBackend::new());
        let mut record = BuildRecord::new(1);
        let started = Instant::now();
        poller.await_processed(&receipt(), Duration::ZERO, Duration::ZERO, &mut record).await.unwrap();
        assert_eq!(started.elapsed().as_secs(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmodeled_status_stops_with_success() {
        let (poller, backend) = poller(MemoryBackend::new().with_statuses(vec![
            ArtifactStatus::Other("DELETING".into()),
            ArtifactStatus::Complete,
        ]));
        let mut record = BuildRecord::new(1);
        poller.await_processed(&receipt(), Duration::ZERO, MINUTE, &mut record).await.unwrap();
        assert_eq!(backend.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_polling() {
        let token = CancellationToken::new();
        let (poller, backend) = poller(MemoryBackend::new().with_statuses(vec![ArtifactStatus::Processing]));
        let poller = poller.with_cancel_token(token.clone());
        token.cancel();
        let mut record = BuildRecord::new(1);
        let err = poller.await_processed(&receipt(), Duration::ZERO, MINUTE, &mut record).await.unwrap_err();
        assert!(matches!(err, GateError::Cancelled(_)));
        assert_eq!(backend.status_calls(), 0);
        assert!(record.result.is_none());
    }

    #[tokio::test]
    async fn test_upload_requires_app_identifiers() {
        let (poller, backend) = poller(MemoryBackend::new());
        let mut artifact = ArtifactUpload::new(ResultsLocation::Local("scan.fpr".into()), "billing", " ");
        let err = poller.upload(&mut artifact).await.unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
        assert_eq!(backend.creations(), 0);
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_config_error() {
        let (poller, backend) = poller(MemoryBackend::new());
        let mut artifact = ArtifactUpload::new(
            ResultsLocation::Local("/nonexistent/scan.fpr".into()),
            "billing",
            "2.1",
        );
        let err = poller.upload(&mut artifact).await.unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
        assert_eq!(backend.creations(), 0);
    }

    #[tokio::test]
    async fn test_upload_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scan.fpr");
        tokio::fs::write(&file, b"results").await.unwrap();

        let (poller, backend) = poller(MemoryBackend::new());
        let mut artifact = ArtifactUpload::new(ResultsLocation::Local(file), "billing", "2.1");
        let receipt = poller.upload(&mut artifact).await.unwrap();

        assert!(receipt.project_id.is_some());
        assert_eq!(backend.uploaded(), vec!["scan.fpr".to_string()]);
        assert!(artifact.log.is_none());
    }

    #[tokio::test]
    async fn test_upload_remote_file_copies_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("remote.fpr");
        tokio::fs::write(&file, b"results").await.unwrap();

        let (poller, backend) = poller(MemoryBackend::new());
        let mut artifact = ArtifactUpload::new(ResultsLocation::Remote(file.clone()), "billing", "2.1");
        poller.upload(&mut artifact).await.unwrap();

        assert_eq!(backend.uploaded(), vec!["remote.fpr".to_string()]);
        let log = artifact.log.unwrap();
        assert!(log.starts_with(&format!("Copied {}", file.display())));
        let copied = log.trim_end().rsplit(" to ").next().unwrap().to_string();
        assert!(!Path::new(&copied).exists());
        assert!(file.exists());
    }
}

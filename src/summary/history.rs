use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::errors::GateError;
use super::record::BuildRecord;
use super::store::{BuildSummary, BuildSummaryStore, Qualifier};

/// One point of the score chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub build: u64,
    pub score: f64,
}

/// The numbered builds of one job directory.
#[derive(Debug, Clone)]
pub struct JobHistory {
    builds_dir: PathBuf,
    store: BuildSummaryStore,
}

impl JobHistory {
    pub fn new(builds_dir: impl Into<PathBuf>) -> Self {
        let builds_dir = builds_dir.into();
        Self { store: BuildSummaryStore::new(&builds_dir), builds_dir }
    }

    pub fn builds_dir(&self) -> &Path {
        &self.builds_dir
    }

    pub fn store(&self) -> &BuildSummaryStore {
        &self.store
    }

    /// Build numbers in ascending order. A missing job directory has no builds.
    pub async fn build_numbers(&self) -> Result<Vec<u64>, GateError> {
        let mut entries = match tokio::fs::read_dir(&self.builds_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut numbers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) {
                numbers.push(n);
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    pub async fn next_build_number(&self) -> Result<u64, GateError> {
        Ok(self.build_numbers().await?.last().map_or(1, |n| n + 1))
    }

    /// Finished builds, newest first.
    pub async fn finished_builds(&self) -> Result<Vec<BuildRecord>, GateError> {
        let mut records = Vec::new();
        for number in self.build_numbers().await?.into_iter().rev() {
            match BuildRecord::load(&self.builds_dir, number).await {
                Ok(Some(record)) if record.is_finished() => records.push(record),
                Ok(_) => {}
                Err(e) => warn!(build = number, error = %e, "Skipping unreadable build record"),
            }
        }
        Ok(records)
    }

    pub async fn last_finished(&self) -> Result<Option<BuildRecord>, GateError> {
        Ok(self.finished_builds().await?.into_iter().next())
    }

    pub async fn previous_finished(&self, before: u64) -> Result<Option<BuildRecord>, GateError> {
        Ok(self
            .finished_builds()
            .await?
            .into_iter()
            .find(|r| r.number < before))
    }

    /// Summary of a build, with unreadable documents logged and treated as absent.
    pub async fn summary_of(&self, build: u64, qualifier: &Qualifier) -> Option<BuildSummary> {
        match self.store.load(build, qualifier).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(build, qualifier = %qualifier, error = %e, "Ignoring unreadable build summary");
                None
            }
        }
    }

    /// (build, score) for every finished build that has a summary, oldest first.
    pub async fn score_history(&self, qualifier: &Qualifier) -> Result<Vec<ScorePoint>, GateError> {
        let mut points = Vec::new();
        for record in self.finished_builds().await?.into_iter().rev() {
            if let Some(summary) = self.summary_of(record.number, qualifier).await {
                points.push(ScorePoint { build: record.number, score: summary.score });
            }
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::record::BuildResult;

    async fn finished(dir: &Path, number: u64, result: BuildResult) {
        let mut record = BuildRecord::new(number);
        record.set_result(result);
        record.finish();
        record.save(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_job_directory() {
        let dir = tempfile::tempdir().unwrap();
        let history = JobHistory::new(dir.path().join("missing"));
        assert!(history.build_numbers().await.unwrap().is_empty());
        assert_eq!(history.next_build_number().await.unwrap(), 1);
        assert!(history.last_finished().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_and_previous_skip_running_builds() {
        let dir = tempfile::tempdir().unwrap();
        finished(dir.path(), 1, BuildResult::Success).await;
        finished(dir.path(), 2, BuildResult::Unstable).await;
        finished(dir.path(), 10, BuildResult::Success).await;
        BuildRecord::new(11).save(dir.path()).await.unwrap();
        tokio::fs::create_dir_all(dir.path().join("not-a-build")).await.unwrap();

        let history = JobHistory::new(dir.path());
        assert_eq!(history.build_numbers().await.unwrap(), vec![1, 2, 10, 11]);
        assert_eq!(history.next_build_number().await.unwrap(), 12);
        let last = history.last_finished().await.unwrap().unwrap();
        assert_eq!(last.number, 10);
        let previous = history.previous_finished(last.number).await.unwrap().unwrap();
        assert_eq!(previous.number, 2);
    }

    #[tokio::test]
    async fn test_score_history_skips_builds_without_summary() {
        let dir = tempfile::tempdir().unwrap();
        let qualifier = Qualifier::new("billing", "2.1");
        for n in 1..=3 {
            finished(dir.path(), n, BuildResult::Success).await;
        }
        let history = JobHistory::new(dir.path());
        history.store().save(1, &qualifier, &BuildSummary { score: 4.0, ..Default::default() }).await.unwrap();
        history.store().save(3, &qualifier, &BuildSummary { score: 2.5, ..Default::default() }).await.unwrap();

        let points = history.score_history(&qualifier).await.unwrap();
        assert_eq!(points, vec![
            ScorePoint { build: 1, score: 4.0 },
            ScorePoint { build: 3, score: 2.5 },
        ]);
    }

    #[tokio::test]
    async fn test_corrupt_summary_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        finished(dir.path(), 1, BuildResult::Success).await;
        let history = JobHistory::new(dir.path());
        let path = history.store().path_for(1, &Qualifier::unqualified());
        tokio::fs::write(&path, "{not json").await.unwrap();
        assert!(history.summary_of(1, &Qualifier::unqualified()).await.is_none());
    }
}

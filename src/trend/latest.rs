use serde::Serialize;
use crate::errors::GateError;
use crate::summary::{JobHistory, Qualifier};
use super::merge::{merge, MergedSummary};

/// Trend of the last finished build against the one before it.
#[derive(Debug, Clone, Serialize)]
pub struct LatestTrend {
    pub build: u64,
    pub previous_build: Option<u64>,
    pub trend: MergedSummary,
}

/// `None` when no build has finished yet.
///
/// A build without a summary (timed out, or failed before scoring) is
/// compared as an empty summary rather than reported as missing.
pub async fn latest_trend(history: &JobHistory, qualifier: &Qualifier) -> Result<Option<LatestTrend>, GateError> {
    let Some(last) = history.last_finished().await? else {
        return Ok(None);
    };
    let current = history.summary_of(last.number, qualifier).await.unwrap_or_default();
    let previous_build = history.previous_finished(last.number).await?.map(|r| r.number);
    let previous = match previous_build {
        Some(number) => history.summary_of(number, qualifier).await,
        None => None,
    };

    Ok(Some(LatestTrend {
        build: last.number,
        previous_build,
        trend: merge(&current, previous.as_ref()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FolderBucket;
    use crate::summary::{BuildRecord, BuildResult, BuildSummary};

    async fn finished(history: &JobHistory, number: u64, result: BuildResult, summary: Option<BuildSummary>) {
        let qualifier = Qualifier::new("billing", "2.1");
        let mut record = BuildRecord::new(number);
        record.add_report(&qualifier);
        record.set_result(result);
        record.finish();
        record.save(history.builds_dir()).await.unwrap();
        if let Some(summary) = summary {
            history.store().save(number, &qualifier, &summary).await.unwrap();
        }
    }

    fn summary(score: f64, high: u32) -> BuildSummary {
        BuildSummary {
            score,
            failed_count: 0,
            total_issues: high,
            folders: vec![FolderBucket::new("h", "High", high, 0)],
            log: None,
        }
    }

    #[tokio::test]
    async fn test_no_finished_builds() {
        let dir = tempfile::tempdir().unwrap();
        let history = JobHistory::new(dir.path());
        assert!(latest_trend(&history, &Qualifier::new("billing", "2.1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_build_without_summary_compares_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = JobHistory::new(dir.path());
        finished(&history, 1, BuildResult::Success, Some(summary(12.5, 4))).await;
        finished(&history, 2, BuildResult::NotBuilt, None).await;

        let latest = latest_trend(&history, &Qualifier::new("billing", "2.1")).await.unwrap().unwrap();
        assert_eq!(latest.build, 2);
        assert_eq!(latest.previous_build, Some(1));
        assert_eq!(latest.trend.score.current, 0.0);
        assert_eq!(latest.trend.score.previous, Some(12.5));
        assert!(latest.trend.score.is_more());
        assert!(latest.trend.folders.is_empty());
    }

    #[tokio::test]
    async fn test_trend_against_previous() {
        let dir = tempfile::tempdir().unwrap();
        let history = JobHistory::new(dir.path());
        finished(&history, 1, BuildResult::Success, Some(summary(12.5, 4))).await;
        finished(&history, 2, BuildResult::Unstable, Some(summary(20.0, 6))).await;

        let latest = latest_trend(&history, &Qualifier::new("billing", "2.1")).await.unwrap().unwrap();
        let high = latest.trend.folder("High").unwrap();
        assert!(high.issues.is_less());
        assert_eq!(high.issues.delta(), Some(2));
    }
}

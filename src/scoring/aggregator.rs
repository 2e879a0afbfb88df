use std::sync::Arc;
use futures::future::join_all;
use tracing::{debug, info, warn};
use crate::backend::{fetch_buckets, GroupingQuery, ResultsBackend};
use crate::config::ScoreSettings;
use crate::errors::GateError;
use crate::models::{count_excluding_not_an_issue, FolderBucket, VersionId};
use crate::summary::BuildSummary;
use crate::utils::formatting::format_score;
use super::nvs::{NvsInputs, SeverityClass};

/// One backend read of the aggregation, tagged with where its count goes.
enum Task {
    Severity { class: SeverityClass, bucket: FolderBucket },
    Classes { all: FolderBucket },
    Failed { all: FolderBucket, condition: String },
}

enum Contribution {
    Inputs(NvsInputs),
    Failed(u32),
}

pub struct ScoreAggregator {
    backend: Arc<dyn ResultsBackend>,
    settings: ScoreSettings,
}

impl ScoreAggregator {
    pub fn new(backend: Arc<dyn ResultsBackend>, settings: ScoreSettings) -> Self {
        Self { backend, settings }
    }

    /// Resolve the version and aggregate. Only an unknown app/version is fatal.
    pub async fn aggregate_for(
        &self,
        app_name: &str,
        app_version: &str,
        filter_set: Option<&str>,
        failure_condition: Option<&str>,
    ) -> Result<BuildSummary, GateError> {
        let project_id = self
            .backend
            .resolve_project_id(app_name)
            .await?
            .ok_or_else(|| GateError::NotFound(format!("Application '{}'", app_name)))?;
        let version_id = self
            .backend
            .resolve_version_id(project_id, app_version)
            .await?
            .ok_or_else(|| {
                GateError::NotFound(format!("Version '{}' of application '{}'", app_version, app_name))
            })?;
        Ok(self.aggregate(version_id, filter_set, failure_condition).await)
    }

    /// Best-effort summary: every failed read is logged and counts as zero.
    pub async fn aggregate(
        &self,
        version_id: VersionId,
        filter_set: Option<&str>,
        failure_condition: Option<&str>,
    ) -> BuildSummary {
        let buckets = match fetch_buckets(self.backend.as_ref(), version_id, filter_set).await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(%version_id, error = %e, "Failed to list folder buckets");
                Vec::new()
            }
        };
        let all = buckets.iter().find(|b| b.is_all()).cloned();
        let folders: Vec<FolderBucket> = buckets.iter().filter(|b| !b.is_all()).cloned().collect();

        let mut tasks: Vec<Task> = folders
            .iter()
            .filter_map(|b| {
                SeverityClass::from_bucket_name(&b.name)
                    .map(|class| Task::Severity { class, bucket: b.clone() })
            })
            .collect();
        if let Some(all) = &all {
            tasks.push(Task::Classes { all: all.clone() });
            if let Some(condition) = failure_condition.map(str::trim).filter(|c| !c.is_empty()) {
                tasks.push(Task::Failed { all: all.clone(), condition: condition.to_string() });
            }
        }

        let contributions = join_all(
            tasks.into_iter().map(|task| self.run(version_id, filter_set, task)),
        ).await;

        let mut inputs = NvsInputs::default();
        let mut failed_count = 0;
        for contribution in contributions {
            match contribution {
                Contribution::Inputs(i) => inputs.merge(&i),
                Contribution::Failed(n) => failed_count += n,
            }
        }

        let score = inputs.score();
        info!(%version_id, score = %format_score(score), failed_count, "Calculated score");
        BuildSummary {
            score,
            failed_count,
            total_issues: all.map_or(0, |a| a.issue_count),
            folders,
            log: None,
        }
    }

    async fn run(&self, version_id: VersionId, filter_set: Option<&str>, task: Task) -> Contribution {
        let (folder, grouping, condition) = match &task {
            Task::Severity { bucket, .. } => (bucket, &self.settings.status_grouping, None),
            Task::Classes { all } => (all, &self.settings.class_grouping, None),
            Task::Failed { all, condition } => (all, &self.settings.status_grouping, Some(condition.clone())),
        };
        let query = GroupingQuery {
            version_id,
            folder_id: folder.id.clone(),
            filter_set: filter_set.map(str::to_string),
            grouping: grouping.clone(),
            condition,
        };

        let values = match self.backend.grouping_values(&query).await {
            Ok(values) => values,
            Err(e) => {
                warn!(folder = %folder.name, grouping = %query.grouping, error = %e, "Grouping query failed, contributing zero");
                Vec::new()
            }
        };

        match task {
            Task::Severity { class, bucket } => {
                let count = count_excluding_not_an_issue(&values);
                debug!(folder = %bucket.name, count, "Folder grouping count");
                let mut inputs = NvsInputs::default();
                inputs.add_severity(class, count);
                Contribution::Inputs(inputs)
            }
            Task::Classes { .. } => {
                let mut inputs = NvsInputs::default();
                inputs.add_class_values(&values);
                Contribution::Inputs(inputs)
            }
            Task::Failed { .. } => Contribution::Failed(count_excluding_not_an_issue(&values)),
        }
    }
}

use std::path::Path;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::errors::GateError;
use crate::models::{
    ArtifactId, ArtifactStatus, FolderBucket, GroupingValue, IssueRow, ProjectId, VersionId,
};

/// Issue template offered by the server when creating a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTemplate {
    pub id: String,
    pub name: String,
    pub default_template: bool,
    pub master_attr_guid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewVersionRequest {
    /// `None` creates the project together with its first version.
    pub project_id: Option<ProjectId>,
    pub app_name: String,
    pub app_version: String,
    pub template: IssueTemplate,
}

/// Breakdown of one folder by a grouping dimension ("Analysis", "Category", ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingQuery {
    pub version_id: VersionId,
    pub folder_id: String,
    pub filter_set: Option<String>,
    pub grouping: String,
    /// Server-side search expression; only its effect on counts matters.
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub version_id: VersionId,
    pub folder_id: String,
    pub filter_set: Option<String>,
    pub start: usize,
    /// `None` fetches everything from `start`.
    pub limit: Option<usize>,
    pub new_only: bool,
    /// Server-side sort key.
    pub order_by: String,
    pub descending: bool,
    /// Group-by display name, resolved by the server implementation.
    pub grouping: Option<String>,
}

/// Everything the gate needs from a findings server. Implemented by the REST
/// client and by the in-memory double used in tests.
#[async_trait]
pub trait ResultsBackend: Send + Sync {
    async fn resolve_project_id(&self, app_name: &str) -> Result<Option<ProjectId>, GateError>;

    async fn resolve_version_id(
        &self,
        project_id: ProjectId,
        app_version: &str,
    ) -> Result<Option<VersionId>, GateError>;

    async fn issue_templates(&self) -> Result<Vec<IssueTemplate>, GateError>;

    async fn create_project_or_version(
        &self,
        request: &NewVersionRequest,
    ) -> Result<(ProjectId, VersionId), GateError>;

    /// Fill required attributes with defaults and mark the version usable.
    async fn commit_version(&self, version_id: VersionId) -> Result<(), GateError>;

    async fn upload_artifact(&self, version_id: VersionId, file: &Path) -> Result<ArtifactId, GateError>;

    async fn artifact_status(&self, artifact_id: ArtifactId) -> Result<ArtifactStatus, GateError>;

    /// Folder buckets of the filter set, without the synthetic "All" bucket.
    async fn list_folder_buckets(
        &self,
        version_id: VersionId,
        filter_set: Option<&str>,
    ) -> Result<Vec<FolderBucket>, GateError>;

    async fn grouping_values(&self, query: &GroupingQuery) -> Result<Vec<GroupingValue>, GateError>;

    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<IssueRow>, GateError>;

    /// Base URL used for deep links.
    fn server_url(&self) -> &str;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}

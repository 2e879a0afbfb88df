use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use crate::errors::GateError;
use crate::models::{
    ArtifactId, ArtifactStatus, FolderBucket, GroupingValue, IssueRow, ProjectId, VersionId,
};
use super::client::{GroupingQuery, IssueQuery, IssueTemplate, NewVersionRequest, ResultsBackend};

#[derive(Debug, Default)]
struct Project {
    id: u64,
    name: String,
    versions: Vec<(u64, String, bool)>,
}

#[derive(Debug, Default)]
struct State {
    projects: Vec<Project>,
    templates: Vec<IssueTemplate>,
    next_id: u64,
    statuses: VecDeque<ArtifactStatus>,
    buckets: Vec<FolderBucket>,
    grouping: HashMap<(String, String, Option<String>), Vec<GroupingValue>>,
    issues: HashMap<String, Vec<IssueRow>>,
    failing_folders: HashSet<String>,
    fail_bucket_listing: bool,
    uploaded: Vec<String>,
    issue_queries: Vec<IssueQuery>,
}

/// Scriptable in-process findings server.
///
/// Artifact statuses are handed out in order; the last one repeats.
#[derive(Debug)]
pub struct MemoryBackend {
    server_url: String,
    state: Mutex<State>,
    creations: AtomicUsize,
    commits: AtomicUsize,
    status_calls: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let state = State {
            next_id: 100,
            templates: vec![IssueTemplate {
                id: "Prioritized-HighRisk-Project-Template".into(),
                name: "Prioritized High Risk Issue Template".into(),
                default_template: true,
                master_attr_guid: None,
            }],
            statuses: VecDeque::from([ArtifactStatus::Complete]),
            ..Default::default()
        };
        Self {
            server_url: "https://ssc.test/ssc".into(),
            state: Mutex::new(state),
            creations: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, GateError> {
        self.state
            .lock()
            .map_err(|_| GateError::Internal("memory backend lock poisoned".into()))
    }

    fn with_state(self, f: impl FnOnce(&mut State)) -> Self {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
        self
    }

    pub fn with_version(self, app_name: &str, app_version: &str) -> Self {
        self.with_state(|s| {
            s.next_id += 1;
            let version_id = s.next_id;
            match s.projects.iter_mut().find(|p| p.name == app_name) {
                Some(project) => project.versions.push((version_id, app_version.into(), true)),
                None => {
                    s.next_id += 1;
                    let project_id = s.next_id;
                    s.projects.push(Project {
                        id: project_id,
                        name: app_name.into(),
                        versions: vec![(version_id, app_version.into(), true)],
                    });
                }
            }
        })
    }

    pub fn with_templates(self, templates: Vec<IssueTemplate>) -> Self {
        self.with_state(|s| s.templates = templates)
    }

    pub fn with_statuses(self, statuses: Vec<ArtifactStatus>) -> Self {
        self.with_state(|s| s.statuses = statuses.into())
    }

    pub fn with_bucket(self, bucket: FolderBucket) -> Self {
        self.with_state(|s| s.buckets.push(bucket))
    }

    pub fn with_grouping_values(
        self,
        folder_id: &str,
        grouping: &str,
        condition: Option<&str>,
        values: Vec<GroupingValue>,
    ) -> Self {
        self.with_state(|s| {
            s.grouping.insert(
                (folder_id.into(), grouping.into(), condition.map(str::to_string)),
                values,
            );
        })
    }

    pub fn with_issues(self, folder_id: &str, rows: Vec<IssueRow>) -> Self {
        self.with_state(|s| {
            s.issues.insert(folder_id.into(), rows);
        })
    }

    pub fn failing_folder(self, folder_id: &str) -> Self {
        self.with_state(|s| {
            s.failing_folders.insert(folder_id.into());
        })
    }

    pub fn failing_bucket_listing(self) -> Self {
        self.with_state(|s| s.fail_bucket_listing = true)
    }

    /// Swap the folder catalogue in place, as a server does after new results land.
    pub fn replace_buckets(&self, buckets: Vec<FolderBucket>) {
        if let Ok(mut state) = self.state.lock() {
            state.buckets = buckets;
        }
    }

    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// File names received by `upload_artifact`, in order.
    pub fn uploaded(&self) -> Vec<String> {
        self.lock().map(|s| s.uploaded.clone()).unwrap_or_default()
    }

    pub fn issue_queries(&self) -> Vec<IssueQuery> {
        self.lock().map(|s| s.issue_queries.clone()).unwrap_or_default()
    }

    pub fn version_committed(&self, version_id: VersionId) -> bool {
        self.lock()
            .map(|s| {
                s.projects
                    .iter()
                    .flat_map(|p| p.versions.iter())
                    .any(|(id, _, committed)| *id == version_id.0 && *committed)
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl ResultsBackend for MemoryBackend {
    async fn resolve_project_id(&self, app_name: &str) -> Result<Option<ProjectId>, GateError> {
        let state = self.lock()?;
        Ok(state.projects.iter().find(|p| p.name == app_name).map(|p| ProjectId(p.id)))
    }

    async fn resolve_version_id(
        &self,
        project_id: ProjectId,
        app_version: &str,
    ) -> Result<Option<VersionId>, GateError> {
        let state = self.lock()?;
        Ok(state
            .projects
            .iter()
            .find(|p| p.id == project_id.0)
            .and_then(|p| p.versions.iter().find(|(_, name, _)| name == app_version))
            .map(|(id, _, _)| VersionId(*id)))
    }

    async fn issue_templates(&self) -> Result<Vec<IssueTemplate>, GateError> {
        Ok(self.lock()?.templates.clone())
    }

    async fn create_project_or_version(
        &self,
        request: &NewVersionRequest,
    ) -> Result<(ProjectId, VersionId), GateError> {
        let mut state = self.lock()?;
        if !state.templates.iter().any(|t| t.id == request.template.id) {
            return Err(GateError::Backend(format!("Unknown issue template {}", request.template.id)));
        }
        state.next_id += 1;
        let version_id = state.next_id;
        let project_id = match request.project_id {
            Some(project_id) => {
                let project = state
                    .projects
                    .iter_mut()
                    .find(|p| p.id == project_id.0)
                    .ok_or_else(|| GateError::NotFound(format!("Project {}", project_id)))?;
                project.versions.push((version_id, request.app_version.clone(), false));
                project_id.0
            }
            None => {
                state.next_id += 1;
                let project_id = state.next_id;
                state.projects.push(Project {
                    id: project_id,
                    name: request.app_name.clone(),
                    versions: vec![(version_id, request.app_version.clone(), false)],
                });
                project_id
            }
        };
        self.creations.fetch_add(1, Ordering::SeqCst);
        Ok((ProjectId(project_id), VersionId(version_id)))
    }

    async fn commit_version(&self, version_id: VersionId) -> Result<(), GateError> {
        let mut state = self.lock()?;
        let version = state
            .projects
            .iter_mut()
            .flat_map(|p| p.versions.iter_mut())
            .find(|(id, _, _)| *id == version_id.0)
            .ok_or_else(|| GateError::NotFound(format!("Version {}", version_id)))?;
        version.2 = true;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upload_artifact(&self, _version_id: VersionId, file: &Path) -> Result<ArtifactId, GateError> {
        if !file.is_file() {
            return Err(GateError::NotFound(format!("Results file {}", file.display())));
        }
        let mut state = self.lock()?;
        state.next_id += 1;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        state.uploaded.push(name);
        Ok(ArtifactId(state.next_id))
    }

    async fn artifact_status(&self, _artifact_id: ArtifactId) -> Result<ArtifactStatus, GateError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock()?;
        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        };
        status.ok_or_else(|| GateError::Backend("No artifact status scripted".into()))
    }

    async fn list_folder_buckets(
        &self,
        _version_id: VersionId,
        _filter_set: Option<&str>,
    ) -> Result<Vec<FolderBucket>, GateError> {
        let state = self.lock()?;
        if state.fail_bucket_listing {
            return Err(GateError::Backend("folder listing unavailable".into()));
        }
        Ok(state.buckets.clone())
    }

    async fn grouping_values(&self, query: &GroupingQuery) -> Result<Vec<GroupingValue>, GateError> {
        let state = self.lock()?;
        if state.failing_folders.contains(&query.folder_id) {
            return Err(GateError::Backend(format!("grouping failed for folder {}", query.folder_id)));
        }
        let key = (query.folder_id.clone(), query.grouping.clone(), query.condition.clone());
        Ok(state.grouping.get(&key).cloned().unwrap_or_default())
    }

    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<IssueRow>, GateError> {
        let mut state = self.lock()?;
        state.issue_queries.push(query.clone());
        if state.failing_folders.contains(&query.folder_id) {
            return Err(GateError::Backend(format!("issue listing failed for folder {}", query.folder_id)));
        }
        let rows = state.issues.get(&query.folder_id).cloned().unwrap_or_default();
        let end = query.limit.map_or(rows.len(), |l| query.start.saturating_add(l).min(rows.len()));
        Ok(rows.get(query.start.min(rows.len())..end).map(<[IssueRow]>::to_vec).unwrap_or_default())
    }

    fn server_url(&self) -> &str {
        &self.server_url
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

use std::sync::Arc;
use std::time::Duration;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use crate::backend::{fetch_buckets, ResultsBackend};
use crate::errors::GateError;
use crate::models::{FolderBucket, IssueRowView, VersionId};
use crate::summary::JobHistory;
use super::sort::SortOrder;
use super::view::{IssueBrowserView, PageSize};

/// Sessions untouched for this long are discarded.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Which application version the browser shows.
#[derive(Debug, Clone)]
pub struct BrowseTarget {
    pub app_name: String,
    pub app_version: String,
    pub filter_set: Option<String>,
    pub page_size: usize,
}

/// Serializable state of one view, as returned to the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub display_name: String,
    pub label: String,
    pub folder: String,
    pub folders: Vec<FolderBucket>,
    pub page: usize,
    pub page_size: PageSize,
    pub first_item_index: usize,
    pub total: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub show_all: bool,
    pub sort: SortOrder,
    pub grouping: String,
    pub issues: Vec<IssueRowView>,
}

struct Session {
    view: Arc<Mutex<IssueBrowserView>>,
    last_access: Instant,
}

#[derive(Debug, Default)]
struct FolderCache {
    version_id: Option<VersionId>,
    folders: Option<Vec<FolderBucket>>,
    /// Newest finished build when `folders` was loaded.
    loaded_at_build: Option<u64>,
}

/// Issue browser views keyed by viewer session.
pub struct BrowserRegistry {
    backend: Arc<dyn ResultsBackend>,
    target: BrowseTarget,
    history: Option<JobHistory>,
    idle_timeout: Duration,
    views: DashMap<String, Session>,
    cache: RwLock<FolderCache>,
}

impl BrowserRegistry {
    pub fn new(backend: Arc<dyn ResultsBackend>, target: BrowseTarget) -> Self {
        Self {
            backend,
            target,
            history: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            views: DashMap::new(),
            cache: RwLock::new(FolderCache::default()),
        }
    }

    /// Reload the folder catalogue whenever a newer build finishes in `history`.
    pub fn with_history(mut self, history: JobHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn display_name(&self) -> String {
        format!("Fortify Assessment ({}-{})", self.target.app_name, self.target.app_version)
    }

    pub fn session_count(&self) -> usize {
        self.views.len()
    }

    async fn version_id(&self) -> Result<VersionId, GateError> {
        if let Some(id) = self.cache.read().await.version_id {
            return Ok(id);
        }
        let project_id = self
            .backend
            .resolve_project_id(&self.target.app_name)
            .await?
            .ok_or_else(|| GateError::NotFound(format!("Application '{}'", self.target.app_name)))?;
        let version_id = self
            .backend
            .resolve_version_id(project_id, &self.target.app_version)
            .await?
            .ok_or_else(|| GateError::NotFound(format!("Version '{}'", self.target.app_version)))?;
        self.cache.write().await.version_id = Some(version_id);
        Ok(version_id)
    }

    async fn latest_build(&self) -> Option<u64> {
        let history = self.history.as_ref()?;
        match history.last_finished().await {
            Ok(record) => record.map(|r| r.number),
            Err(e) => {
                warn!(error = %e, "Failed to read build history");
                None
            }
        }
    }

    /// Folder catalogue including "All".
    ///
    /// Reloaded when a newer build has finished since the last load.
    /// Failed fetches are not cached.
    pub async fn folders(&self) -> Result<Vec<FolderBucket>, GateError> {
        let latest = self.latest_build().await;
        {
            let cache = self.cache.read().await;
            if let Some(folders) = &cache.folders {
                if cache.loaded_at_build == latest {
                    return Ok(folders.clone());
                }
                debug!(cached = ?cache.loaded_at_build, latest = ?latest, "Folder catalogue is stale");
            }
        }
        let version_id = self.version_id().await?;
        let folders = fetch_buckets(
            self.backend.as_ref(),
            version_id,
            self.target.filter_set.as_deref(),
        ).await?;
        info!(%version_id, count = folders.len(), "Loaded folder catalogue");
        let mut cache = self.cache.write().await;
        cache.folders = Some(folders.clone());
        cache.loaded_at_build = latest;
        Ok(folders)
    }

    async fn folder_named(&self, name: &str) -> Result<FolderBucket, GateError> {
        self.folders()
            .await?
            .into_iter()
            .find(|f| f.name == name)
            .ok_or_else(|| GateError::NotFound(format!("Folder '{}'", name)))
    }

    fn evict_idle(&self) {
        let now = Instant::now();
        let before = self.views.len();
        self.views
            .retain(|_, s| now.duration_since(s.last_access) < self.idle_timeout);
        let evicted = before.saturating_sub(self.views.len());
        if evicted > 0 {
            debug!(evicted, "Discarded idle issue browser sessions");
        }
    }

    /// The session's view; a first visit starts on the first folder.
    pub async fn view(&self, session: &str, first_time: bool) -> Result<Arc<Mutex<IssueBrowserView>>, GateError> {
        self.evict_idle();
        if !first_time {
            if let Some(mut entry) = self.views.get_mut(session) {
                entry.last_access = Instant::now();
                return Ok(entry.view.clone());
            }
        }
        let folders = self.folders().await?;
        let first = folders
            .into_iter()
            .next()
            .ok_or_else(|| GateError::NotFound("No folders available for this version".into()))?;
        let view = IssueBrowserView::new(
            self.version_id().await?,
            first,
            PageSize::Fixed(self.target.page_size),
        )
        .with_filter_set(self.target.filter_set.clone());
        let view = Arc::new(Mutex::new(view));
        self.views.insert(
            session.to_string(),
            Session { view: view.clone(), last_access: Instant::now() },
        );
        debug!(session, "Created issue browser view");
        Ok(view)
    }

    pub fn end_session(&self, session: &str) -> bool {
        self.views.remove(session).is_some()
    }

    pub async fn snapshot(&self, session: &str, first_time: bool) -> Result<ViewSnapshot, GateError> {
        let view = self.view(session, first_time).await?;
        let folders = self.folders().await.unwrap_or_else(|e| {
            warn!(error = %e, "Folder catalogue unavailable");
            Vec::new()
        });
        let mut view = view.lock().await;
        if let Some(current) = folders.iter().find(|f| f.name == view.folder().name) {
            view.refresh_folder(current);
        }
        let issues: Vec<IssueRowView> = view
            .get_issues(self.backend.as_ref())
            .await?
            .iter()
            .map(|row| {
                IssueRowView::new(
                    row,
                    self.backend.server_url(),
                    &self.target.app_name,
                    &self.target.app_version,
                )
            })
            .collect();

        Ok(ViewSnapshot {
            display_name: self.display_name(),
            label: view.display_label(),
            folder: view.folder().name.clone(),
            folders,
            page: view.page(),
            page_size: view.page_size(),
            first_item_index: view.first_item_index(),
            total: view.total_for_toggle(),
            has_next: view.has_next(),
            has_previous: view.has_previous(),
            show_all: view.show_all(),
            sort: view.sort(),
            grouping: view.grouping().to_string(),
            issues,
        })
    }

    pub async fn set_folder(&self, session: &str, name: &str) -> Result<(), GateError> {
        let folder = self.folder_named(name).await?;
        self.view(session, false).await?.lock().await.set_folder(folder);
        Ok(())
    }

    pub async fn set_page(&self, session: &str, page: usize) -> Result<(), GateError> {
        self.view(session, false).await?.lock().await.set_page(page);
        Ok(())
    }

    pub async fn set_page_size(&self, session: &str, page_size: PageSize) -> Result<(), GateError> {
        self.view(session, false).await?.lock().await.set_page_size(page_size);
        Ok(())
    }

    pub async fn set_show_all(&self, session: &str, show_all: bool) -> Result<(), GateError> {
        self.view(session, false).await?.lock().await.set_show_all(show_all);
        Ok(())
    }

    pub async fn set_sort(&self, session: &str, sort: SortOrder) -> Result<(), GateError> {
        self.view(session, false).await?.lock().await.set_sort(sort);
        Ok(())
    }

    pub async fn set_grouping(&self, session: &str, grouping: &str) -> Result<(), GateError> {
        self.view(session, false).await?.lock().await.set_grouping(grouping);
        Ok(())
    }
}

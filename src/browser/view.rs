use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::backend::{IssueQuery, ResultsBackend};
use crate::errors::GateError;
use crate::models::{FolderBucket, IssueRow, VersionId, GROUPING_CATEGORY};
use super::sort::SortOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    Fixed(usize),
    /// Everything in the folder on one page.
    All,
}

impl PageSize {
    /// `-1` and `0` mean show everything.
    pub fn from_request(size: i64) -> Self {
        if size <= 0 { Self::All } else { Self::Fixed(size as usize) }
    }
}

/// One viewer's position in the issue list of a version.
///
/// Every setter marks the view dirty; `get_issues` refetches only when dirty.
#[derive(Debug, Clone)]
pub struct IssueBrowserView {
    version_id: VersionId,
    filter_set: Option<String>,
    folder: FolderBucket,
    page: usize,
    page_size: PageSize,
    sort: SortOrder,
    show_all: bool,
    grouping: String,
    rows: Vec<IssueRow>,
    dirty: bool,
}

impl IssueBrowserView {
    pub fn new(version_id: VersionId, folder: FolderBucket, page_size: PageSize) -> Self {
        Self {
            version_id,
            filter_set: None,
            folder,
            page: 0,
            page_size,
            sort: SortOrder::default(),
            show_all: true,
            grouping: GROUPING_CATEGORY.to_string(),
            rows: Vec::new(),
            dirty: true,
        }
    }

    pub fn with_filter_set(mut self, filter_set: Option<String>) -> Self {
        self.filter_set = filter_set;
        self
    }

    pub fn folder(&self) -> &FolderBucket {
        &self.folder
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn grouping(&self) -> &str {
        &self.grouping
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Keeps page, sort and toggle.
    pub fn set_folder(&mut self, folder: FolderBucket) {
        self.folder = folder;
        self.dirty = true;
    }

    /// Adopt fresh counts for the selected folder after a catalogue reload.
    /// Marks dirty only when the folder actually changed.
    pub fn refresh_folder(&mut self, folder: &FolderBucket) {
        if self.folder.name == folder.name && self.folder != *folder {
            self.folder = folder.clone();
            self.dirty = true;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
        self.dirty = true;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        if self.page_size != page_size {
            self.page = 0;
        }
        self.page_size = page_size;
        self.dirty = true;
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.dirty = true;
    }

    pub fn set_show_all(&mut self, show_all: bool) {
        if self.show_all != show_all {
            self.page = 0;
        }
        self.show_all = show_all;
        self.dirty = true;
    }

    pub fn set_grouping(&mut self, grouping: &str) {
        self.grouping = grouping.to_string();
        self.dirty = true;
    }

    /// Issue count of the selected folder under the current toggle.
    pub fn total_for_toggle(&self) -> usize {
        self.folder.count_for(self.show_all) as usize
    }

    pub fn effective_page_size(&self) -> usize {
        match self.page_size {
            PageSize::Fixed(size) => size,
            PageSize::All => self.total_for_toggle(),
        }
    }

    pub fn first_item_index(&self) -> usize {
        match self.page_size {
            PageSize::Fixed(size) => self.page.saturating_mul(size),
            PageSize::All => 0,
        }
    }

    pub fn has_next(&self) -> bool {
        match self.page_size {
            PageSize::Fixed(size) => self.page.saturating_add(1).saturating_mul(size) < self.total_for_toggle(),
            PageSize::All => false,
        }
    }

    pub fn has_previous(&self) -> bool {
        matches!(self.page_size, PageSize::Fixed(_)) && !self.folder.is_empty() && self.page > 0
    }

    /// `"High (1 to 50 out of 120)"`, or an empty-page label.
    ///
    /// The empty label follows the toggle only: `"High (No Issues)"` when
    /// showing everything, `"High (No New Issues)"` when showing new issues.
    /// The page index plays no part, so page 0 of an empty new-only listing
    /// still reads "No New Issues".
    pub fn display_label(&self) -> String {
        let total = self.total_for_toggle();
        let first = self.first_item_index();
        if total == 0 || first >= total {
            let empty = if self.show_all { "No Issues" } else { "No New Issues" };
            return format!("{} ({})", self.folder.name, empty);
        }
        let last = (first + self.effective_page_size()).min(total);
        format!("{} ({} to {} out of {})", self.folder.name, first + 1, last, total)
    }

    /// Cached rows when clean, otherwise one fetch from the backend.
    /// A failed fetch leaves the view dirty.
    pub async fn get_issues(&mut self, backend: &dyn ResultsBackend) -> Result<&[IssueRow], GateError> {
        if !self.dirty {
            return Ok(&self.rows);
        }
        if self.first_item_index() >= self.total_for_toggle() {
            self.rows.clear();
            self.dirty = false;
            return Ok(&self.rows);
        }

        let query = IssueQuery {
            version_id: self.version_id,
            folder_id: self.folder.id.clone(),
            filter_set: self.filter_set.clone(),
            start: self.first_item_index(),
            limit: match self.page_size {
                PageSize::Fixed(size) => Some(size),
                PageSize::All => None,
            },
            new_only: !self.show_all,
            order_by: self.sort.key.server_key().to_string(),
            descending: self.sort.descending,
            grouping: Some(self.grouping.clone()),
        };
        let mut rows = backend.list_issues(&query).await?;
        let sort = self.sort;
        rows.sort_by(|a, b| sort.compare(a, b));
        debug!(folder = %self.folder.name, page = self.page, rows = rows.len(), "Materialized issue page");

        self.rows = rows;
        self.dirty = false;
        Ok(&self.rows)
    }
}

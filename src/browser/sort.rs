use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use crate::errors::GateError;
use crate::models::{
    IssueRow, NAME_CRITICAL, NAME_HIGH, NAME_HOT, NAME_INFO, NAME_LOW, NAME_MEDIUM, NAME_WARNING,
};

/// Column an issue page is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// File path, then line number.
    #[default]
    Location,
    Category,
    Severity,
}

impl SortKey {
    pub fn parse(name: &str) -> Result<Self, GateError> {
        match name.to_ascii_lowercase().as_str() {
            "location" | "file" => Ok(Self::Location),
            "category" | "type" => Ok(Self::Category),
            "severity" | "priority" => Ok(Self::Severity),
            other => Err(GateError::InvalidInput(format!("Unknown sort order '{}'", other))),
        }
    }

    /// Order-by field understood by the findings server.
    pub fn server_key(&self) -> &'static str {
        match self {
            Self::Location => "fullFileName",
            Self::Category => "issueName",
            Self::Severity => "friority",
        }
    }

    pub fn compare(&self, a: &IssueRow, b: &IssueRow) -> Ordering {
        match self {
            Self::Location => compare_location(a, b),
            Self::Category => a
                .category
                .to_lowercase()
                .cmp(&b.category.to_lowercase())
                .then_with(|| compare_location(a, b)),
            Self::Severity => severity_rank(&a.severity)
                .cmp(&severity_rank(&b.severity))
                .then_with(|| a.severity.cmp(&b.severity))
                .then_with(|| compare_location(a, b)),
        }
    }
}

/// Most severe first; unknown names sort last.
fn severity_rank(severity: &str) -> u8 {
    match severity {
        NAME_CRITICAL | NAME_HOT => 0,
        NAME_HIGH | NAME_WARNING => 1,
        NAME_MEDIUM => 2,
        NAME_LOW | NAME_INFO => 3,
        _ => 4,
    }
}

fn compare_location(a: &IssueRow, b: &IssueRow) -> Ordering {
    a.file_path
        .to_lowercase()
        .cmp(&b.file_path.to_lowercase())
        .then(a.line_number.cmp(&b.line_number))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortOrder {
    pub key: SortKey,
    pub descending: bool,
}

impl SortOrder {
    pub fn new(key: SortKey, descending: bool) -> Self {
        Self { key, descending }
    }

    /// Descending swaps the comparands; the comparator itself is unchanged.
    pub fn compare(&self, a: &IssueRow, b: &IssueRow) -> Ordering {
        if self.descending {
            self.key.compare(b, a)
        } else {
            self.key.compare(a, b)
        }
    }
}

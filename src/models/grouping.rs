use serde::{Deserialize, Serialize};

pub const ID_EXPLOITABLE: &str = "Exploitable";
pub const ID_SUSPICIOUS: &str = "Suspicious";
pub const ID_BAD_PRACTICE: &str = "Bad Practice";
pub const ID_RELIABILITY: &str = "Reliability Issue";
pub const ID_NOT_AN_ISSUE: &str = "Not an Issue";

/// Group-by dimension whose values are audit analysis tags.
pub const GROUPING_ANALYSIS: &str = "Analysis";
/// Default group-by for the issue browser.
pub const GROUPING_CATEGORY: &str = "Category";

/// One value within a grouping dimension, scoped to a folder. Scoring input only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingValue {
    pub id: String,
    pub name: String,
    pub folder_id: String,
    pub total_count: u32,
    pub visible_count: u32,
    pub audited_count: u32,
}

impl GroupingValue {
    pub fn new(id: &str, name: &str, folder_id: &str, total_count: u32) -> Self {
        Self {
            id: id.trim().to_string(),
            name: name.trim().to_string(),
            folder_id: folder_id.to_string(),
            total_count,
            visible_count: total_count,
            audited_count: 0,
        }
    }

    pub fn is_not_an_issue(&self) -> bool {
        self.name == ID_NOT_AN_ISSUE
    }
}

/// Sum of totals, skipping values audited as "Not an Issue".
pub fn count_excluding_not_an_issue(values: &[GroupingValue]) -> u32 {
    values
        .iter()
        .filter(|v| !v.is_not_an_issue())
        .map(|v| v.total_count)
        .sum()
}

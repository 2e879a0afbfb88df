use serde::{Deserialize, Serialize};

/// Name and id of the synthetic bucket spanning every real bucket.
pub const ALL_BUCKET_NAME: &str = "All";
pub const ALL_BUCKET_ID: &str = "f599639d-f500-e046-2fd1-d82b5e9b26b4";
const ALL_BUCKET_COLOR: &str = "80A958";

pub const NAME_CRITICAL: &str = "Critical";
pub const NAME_HIGH: &str = "High";
pub const NAME_MEDIUM: &str = "Medium";
pub const NAME_LOW: &str = "Low";
// Legacy filter sets
pub const NAME_HOT: &str = "Hot";
pub const NAME_WARNING: &str = "Warning";
pub const NAME_INFO: &str = "Info";

/// One severity/priority folder of a version under a filter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderBucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    pub issue_count: u32,
    /// Generally `issue_count >= new_issue_count`.
    pub new_issue_count: u32,
}

impl FolderBucket {
    pub fn new(id: &str, name: &str, issue_count: u32, new_issue_count: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            color: String::new(),
            issue_count,
            new_issue_count,
        }
    }

    pub fn is_all(&self) -> bool {
        self.name == ALL_BUCKET_NAME
    }

    pub fn is_empty(&self) -> bool {
        self.issue_count == 0
    }

    /// Issue count for the show-all vs show-new-only toggle.
    pub fn count_for(&self, show_all: bool) -> u32 {
        if show_all { self.issue_count } else { self.new_issue_count }
    }
}

/// Drop any server-provided "All" bucket and append one whose counts are the
/// sums over the real buckets.
pub fn with_all_bucket(buckets: Vec<FolderBucket>) -> Vec<FolderBucket> {
    let mut real: Vec<FolderBucket> = buckets.into_iter().filter(|b| !b.is_all()).collect();
    let total: u32 = real.iter().map(|b| b.issue_count).sum();
    let new_total: u32 = real.iter().map(|b| b.new_issue_count).sum();
    real.push(FolderBucket {
        id: ALL_BUCKET_ID.to_string(),
        name: ALL_BUCKET_NAME.to_string(),
        description: String::new(),
        color: ALL_BUCKET_COLOR.to_string(),
        issue_count: total,
        new_issue_count: new_total,
    });
    real
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buckets() -> Vec<FolderBucket> {
        vec![
            FolderBucket::new("c", NAME_CRITICAL, 3, 1),
            FolderBucket::new("h", NAME_HIGH, 7, 2),
            FolderBucket::new("l", NAME_LOW, 0, 0),
        ]
    }

    #[test]
    fn test_all_bucket_sums_real_buckets() {
        let list = with_all_bucket(buckets());
        let all = list.iter().find(|b| b.is_all()).unwrap();
        assert_eq!(all.issue_count, 10);
        assert_eq!(all.new_issue_count, 3);
        assert_eq!(all.id, ALL_BUCKET_ID);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_all_bucket_replaces_server_all() {
        let mut input = buckets();
        input.push(FolderBucket::new("x", ALL_BUCKET_NAME, 999, 999));
        let list = with_all_bucket(input);
        let alls: Vec<_> = list.iter().filter(|b| b.is_all()).collect();
        assert_eq!(alls.len(), 1);
        assert_eq!(alls[0].issue_count, 10);
    }

    #[test]
    fn test_all_bucket_on_empty_list() {
        let list = with_all_bucket(Vec::new());
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].issue_count, 0);
        assert!(list[0].is_empty());
    }

    #[test]
    fn test_count_for_toggle() {
        let b = FolderBucket::new("h", NAME_HIGH, 7, 2);
        assert_eq!(b.count_for(true), 7);
        assert_eq!(b.count_for(false), 2);
    }
}

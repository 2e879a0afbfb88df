use serde::Serialize;
use crate::models::FolderBucket;
use crate::summary::BuildSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Less,
    More,
    Equal,
}

/// A current value next to its previous counterpart, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison<T> {
    pub current: T,
    pub previous: Option<T>,
    pub direction: Option<Direction>,
}

impl<T: PartialOrd + Copy> Comparison<T> {
    pub fn new(current: T, previous: Option<T>) -> Self {
        let direction = previous.map(|prev| {
            if current < prev {
                Direction::Less
            } else if current > prev {
                Direction::More
            } else {
                Direction::Equal
            }
        });
        Self { current, previous, direction }
    }

    pub fn has_prev(&self) -> bool {
        self.previous.is_some()
    }

    /// The previous build had more.
    pub fn is_more(&self) -> bool {
        self.direction == Some(Direction::Less)
    }

    /// The previous build had less.
    pub fn is_less(&self) -> bool {
        self.direction == Some(Direction::More)
    }
}

impl Comparison<f64> {
    pub fn delta(&self) -> Option<f64> {
        self.previous.map(|p| self.current - p)
    }
}

impl Comparison<u32> {
    pub fn delta(&self) -> Option<i64> {
        self.previous.map(|p| i64::from(self.current) - i64::from(p))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderTrend {
    pub id: String,
    pub name: String,
    pub color: String,
    pub issues: Comparison<u32>,
    pub new_issues: Comparison<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSummary {
    pub score: Comparison<f64>,
    pub total_issues: Comparison<u32>,
    pub failed_count: Comparison<u32>,
    pub folders: Vec<FolderTrend>,
}

impl MergedSummary {
    pub fn folder(&self, name: &str) -> Option<&FolderTrend> {
        self.folders.iter().find(|f| f.name == name)
    }
}

/// Line up the current build's numbers against the previous build's.
/// Folders match by name; previous-only folders are dropped.
pub fn merge(current: &BuildSummary, previous: Option<&BuildSummary>) -> MergedSummary {
    let folders = current
        .folders
        .iter()
        .filter(|f| !f.is_all())
        .map(|folder| {
            let prev: Option<&FolderBucket> = previous.and_then(|p| p.folder(&folder.name));
            FolderTrend {
                id: folder.id.clone(),
                name: folder.name.clone(),
                color: folder.color.clone(),
                issues: Comparison::new(folder.issue_count, prev.map(|p| p.issue_count)),
                new_issues: Comparison::new(folder.new_issue_count, prev.map(|p| p.new_issue_count)),
            }
        })
        .collect();

    MergedSummary {
        score: Comparison::new(current.score, previous.map(|p| p.score)),
        total_issues: Comparison::new(current.total_issues, previous.map(|p| p.total_issues)),
        failed_count: Comparison::new(current.failed_count, previous.map(|p| p.failed_count)),
        folders,
    }
}

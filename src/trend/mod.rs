pub mod latest;
pub mod merge;

pub use latest::{latest_trend, LatestTrend};
pub use merge::{merge, Comparison, Direction, FolderTrend, MergedSummary};

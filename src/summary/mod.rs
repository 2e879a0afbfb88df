pub mod history;
pub mod record;
pub mod store;

pub use history::{JobHistory, ScorePoint};
pub use record::{BuildRecord, BuildResult};
pub use store::{BuildSummary, BuildSummaryStore, Qualifier};

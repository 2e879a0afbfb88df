pub mod aggregator;
pub mod nvs;

pub use aggregator::ScoreAggregator;
pub use nvs::{ExploitClass, NvsInputs, SeverityClass};

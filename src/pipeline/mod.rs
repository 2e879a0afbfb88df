pub mod step;

pub use step::{BuildOutcome, UploadStep};

pub mod poller;
pub mod project;

pub use poller::{UploadPoller, UploadReceipt};
pub use project::{ensure_version, select_template};

pub mod registry;
pub mod sort;
pub mod view;

pub use registry::{BrowseTarget, BrowserRegistry, ViewSnapshot};
pub use sort::{SortKey, SortOrder};
pub use view::{IssueBrowserView, PageSize};

use serde::Deserialize;
use crate::summary::Qualifier;

#[derive(Debug, Deserialize, Default)]
pub struct QualifierQuery {
    pub app: Option<String>,
    pub version: Option<String>,
}

impl QualifierQuery {
    /// Explicit query values, else the qualifier the server was started with.
    pub fn or(&self, default: &Qualifier) -> Qualifier {
        if self.app.is_none() && self.version.is_none() {
            return default.clone();
        }
        Qualifier::new(
            self.app.as_deref().unwrap_or_default(),
            self.version.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct IssuesQuery {
    pub first_time: Option<String>,
}

impl IssuesQuery {
    pub fn is_first_time(&self) -> bool {
        self.first_time
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Deserialize)]
pub struct FolderRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub page: usize,
}

#[derive(Debug, Deserialize)]
pub struct PageSizeRequest {
    /// `-1` shows every issue on one page.
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub struct ShowAllRequest {
    pub show_all: bool,
}

#[derive(Debug, Deserialize)]
pub struct SortRequest {
    pub key: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Deserialize)]
pub struct GroupingRequest {
    pub grouping: String,
}

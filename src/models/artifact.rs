use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// Processing state of an uploaded artifact as reported by the findings server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Uploading,
    Processing,
    /// Held for manual approval on the server.
    RequireAuth,
    Complete,
    Error,
    /// A status this client does not model.
    Other(String),
}

impl ArtifactStatus {
    /// Map the server's wire name onto the modeled states.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "PROCESS_COMPLETE" => Self::Complete,
            "ERROR_PROCESSING" => Self::Error,
            "REQUIRE_AUTH" => Self::RequireAuth,
            "PROCESSING" | "SCHED_PROCESSING" => Self::Processing,
            "UPLOADING" => Self::Uploading,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::RequireAuth => "require_auth",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the results file lives relative to the process doing the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsLocation {
    Local(PathBuf),
    /// Produced on another execution node (e.g. a mounted agent workspace);
    /// copied into a private temp directory before uploading.
    Remote(PathBuf),
}

impl ResultsLocation {
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(p) | Self::Remote(p) => p,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// One findings-file submission for a build.
#[derive(Debug, Clone)]
pub struct ArtifactUpload {
    pub results: ResultsLocation,
    pub app_name: String,
    pub app_version: String,
    /// Free-text log accumulated while retrieving the results file.
    pub log: Option<String>,
}

impl ArtifactUpload {
    pub fn new(results: ResultsLocation, app_name: &str, app_version: &str) -> Self {
        Self {
            results,
            app_name: app_name.to_string(),
            app_version: app_version.to_string(),
            log: None,
        }
    }

    pub fn log(&mut self, msg: &str) {
        match &mut self.log {
            Some(existing) => existing.push_str(msg),
            None => self.log = Some(msg.to_string()),
        }
    }
}

const ACCEPTED_EXTENSIONS: &[&str] = &[".fpr", ".zip"];

/// Append `.fpr` unless the path already carries an accepted extension.
/// `.zip` is allowed for third-party results.
pub fn normalize_results_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Some(PathBuf::from(trimmed))
    } else {
        Some(PathBuf::from(format!("{}.fpr", trimmed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_wire() {
        assert_eq!(ArtifactStatus::from_wire("PROCESS_COMPLETE"), ArtifactStatus::Complete);
        assert_eq!(ArtifactStatus::from_wire("ERROR_PROCESSING"), ArtifactStatus::Error);
        assert_eq!(ArtifactStatus::from_wire("REQUIRE_AUTH"), ArtifactStatus::RequireAuth);
        assert_eq!(ArtifactStatus::from_wire("SCHED_PROCESSING"), ArtifactStatus::Processing);
        assert_eq!(
            ArtifactStatus::from_wire("DELETING"),
            ArtifactStatus::Other("DELETING".to_string())
        );
    }

    #[test]
    fn test_normalize_appends_fpr() {
        assert_eq!(normalize_results_path("scan"), Some(PathBuf::from("scan.fpr")));
        assert_eq!(normalize_results_path("scan.fpr"), Some(PathBuf::from("scan.fpr")));
        assert_eq!(normalize_results_path("third.ZIP"), Some(PathBuf::from("third.ZIP")));
        assert_eq!(normalize_results_path("   "), None);
    }

    #[test]
    fn test_upload_log_accumulates() {
        let mut upload = ArtifactUpload::new(ResultsLocation::Local("a.fpr".into()), "app", "1.0");
        assert!(upload.log.is_none());
        upload.log("copied from agent; ");
        upload.log("size 12KB");
        assert_eq!(upload.log.as_deref(), Some("copied from agent; size 12KB"));
    }
}

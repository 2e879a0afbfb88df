use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::errors::GateError;
use crate::models::FolderBucket;

const BASE_NAME: &str = "fortify";

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));

/// Score and breakdown recorded for one (build, app, version).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub score: f64,
    pub failed_count: u32,
    pub total_issues: u32,
    /// Real folder buckets; the "All" total lives in `total_issues`.
    #[serde(default)]
    pub folders: Vec<FolderBucket>,
    #[serde(default)]
    pub log: Option<String>,
}

impl BuildSummary {
    pub fn folder(&self, name: &str) -> Option<&FolderBucket> {
        self.folders.iter().find(|f| f.name == name)
    }
}

/// Optional (app, version) pair distinguishing several reports of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Qualifier {
    pub app: Option<String>,
    pub version: Option<String>,
}

impl Qualifier {
    pub fn new(app: &str, version: &str) -> Self {
        Self {
            app: Some(app.to_string()).filter(|a| !a.is_empty()),
            version: Some(version.to_string()).filter(|v| !v.is_empty()),
        }
    }

    pub fn unqualified() -> Self {
        Self::default()
    }

    pub fn file_name(&self) -> String {
        let mut name = BASE_NAME.to_string();
        for part in [&self.app, &self.version].into_iter().flatten() {
            name.push('-');
            name.push_str(&UNSAFE_CHARS.replace_all(part, "_"));
        }
        name.push_str(".json");
        name
    }
}

impl std::fmt::Display for Qualifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.app, &self.version) {
            (Some(app), Some(version)) => write!(f, "{}-{}", app, version),
            (Some(app), None) => f.write_str(app),
            (None, Some(version)) => f.write_str(version),
            (None, None) => f.write_str("(default)"),
        }
    }
}

/// Reads and writes summaries under `<builds_dir>/<build>/`.
#[derive(Debug, Clone)]
pub struct BuildSummaryStore {
    builds_dir: PathBuf,
}

impl BuildSummaryStore {
    pub fn new(builds_dir: impl Into<PathBuf>) -> Self {
        Self { builds_dir: builds_dir.into() }
    }

    pub fn builds_dir(&self) -> &Path {
        &self.builds_dir
    }

    pub fn path_for(&self, build: u64, qualifier: &Qualifier) -> PathBuf {
        self.builds_dir.join(build.to_string()).join(qualifier.file_name())
    }

    pub async fn save(&self, build: u64, qualifier: &Qualifier, summary: &BuildSummary) -> Result<(), GateError> {
        let path = self.path_for(build, qualifier);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(summary)?;
        write_atomic(&path, &json).await?;
        debug!(build, qualifier = %qualifier, path = %path.display(), "Saved build summary");
        Ok(())
    }

    /// `Ok(None)` when the build never wrote a summary for this qualifier.
    pub async fn load(&self, build: u64, qualifier: &Qualifier) -> Result<Option<BuildSummary>, GateError> {
        let path = self.path_for(build, qualifier);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write to a sibling temp file and rename it into place.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> Result<(), GateError> {
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

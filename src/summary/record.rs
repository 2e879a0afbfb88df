use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::errors::GateError;
use super::store::{write_atomic, Qualifier};

const RECORD_FILE: &str = "build.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    Success,
    /// Issues matched the failure condition.
    Unstable,
    /// Processing did not finish in time. Not a failure.
    NotBuilt,
    Failure,
}

impl BuildResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Unstable => "unstable",
            Self::NotBuilt => "not_built",
            Self::Failure => "failure",
        }
    }

    /// Keeps the worse of two results.
    pub fn combine(self, other: BuildResult) -> BuildResult {
        fn rank(r: BuildResult) -> u8 {
            match r {
                BuildResult::Success => 0,
                BuildResult::Unstable => 1,
                BuildResult::NotBuilt => 2,
                BuildResult::Failure => 3,
            }
        }
        if rank(other) > rank(self) { other } else { self }
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `build.json` document of one numbered build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub number: u64,
    /// `None` while the build is running.
    pub result: Option<BuildResult>,
    pub description: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reports: Vec<Qualifier>,
}

impl BuildRecord {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            result: None,
            description: None,
            started_at: Utc::now(),
            finished_at: None,
            reports: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn add_report(&mut self, qualifier: &Qualifier) {
        if !self.reports.contains(qualifier) {
            self.reports.push(qualifier.clone());
        }
    }

    pub fn set_result(&mut self, result: BuildResult) {
        self.result = Some(match self.result {
            Some(current) => current.combine(result),
            None => result,
        });
    }

    pub fn mark_not_built(&mut self, description: &str) {
        self.set_result(BuildResult::NotBuilt);
        self.description = Some(description.to_string());
    }

    pub fn finish(&mut self) {
        if self.result.is_none() {
            self.result = Some(BuildResult::Success);
        }
        self.finished_at = Some(Utc::now());
    }

    pub fn path_in(builds_dir: &Path, number: u64) -> PathBuf {
        builds_dir.join(number.to_string()).join(RECORD_FILE)
    }

    pub async fn save(&self, builds_dir: &Path) -> Result<(), GateError> {
        let path = Self::path_in(builds_dir, self.number);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(&path, &serde_json::to_string_pretty(self)?).await
    }

    pub async fn load(builds_dir: &Path, number: u64) -> Result<Option<BuildRecord>, GateError> {
        match tokio::fs::read_to_string(Self::path_in(builds_dir, number)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

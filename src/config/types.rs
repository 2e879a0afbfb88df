use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::errors::GateError;
use crate::models::grouping::GROUPING_ANALYSIS;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_POLL_INTERVAL_MINUTES: u64 = 1;

/// On-disk configuration file. Every section is optional; CLI flags and the
/// environment fill the gaps.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GateConfig {
    pub backend: Option<BackendSettings>,
    pub upload: Option<UploadSettings>,
    pub storage: Option<StorageSettings>,
    pub scoring: Option<ScoringSettings>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackendSettings {
    pub url: Option<String>,
    pub token: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub write_timeout_secs: Option<u64>,
    pub proxy: Option<ProxySettings>,
    pub issue_template: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct UploadSettings {
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub results_file: Option<String>,
    pub filter_set: Option<String>,
    pub failure_condition: Option<String>,
    pub timeout_minutes: Option<u64>,
    pub poll_interval_minutes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageSettings {
    pub builds_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScoringSettings {
    pub status_grouping: Option<String>,
    pub class_grouping: Option<String>,
}

/// Resolved connection settings for the findings server, built once per
/// invocation and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub token: String,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub proxy: Option<ProxySettings>,
    pub issue_template: Option<String>,
    pub page_size: usize,
}

impl BackendConfig {
    pub fn new(url: &str, token: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            proxy: None,
            issue_template: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Fails with a configuration error before any network call is made.
    pub fn validate(&self) -> Result<(), GateError> {
        if self.url.trim().is_empty() {
            return Err(GateError::Config("Findings server URL is not specified".into()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(GateError::Config(format!(
                "Findings server URL must start with http:// or https://: {}",
                self.url
            )));
        }
        if self.token.trim().is_empty() {
            return Err(GateError::Config("Authentication token is not specified".into()));
        }
        Ok(())
    }

    /// Where the artifacts of a version can be inspected on the server.
    pub fn artifacts_url(&self, version_id: impl std::fmt::Display) -> String {
        format!("{}/html/ssc/version/{}/artifacts", self.url, version_id)
    }
}

/// Resolved inputs of one upload step.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub app_name: String,
    pub app_version: String,
    pub results_file: String,
    pub results_remote: bool,
    pub filter_set: Option<String>,
    pub failure_condition: Option<String>,
    /// Zero means wait forever.
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), GateError> {
        if self.app_name.trim().is_empty() || self.app_version.trim().is_empty() {
            return Err(GateError::Config(format!(
                "Application name and version are required (name='{}', version='{}')",
                self.app_name, self.app_version
            )));
        }
        if self.results_file.trim().is_empty() {
            return Err(GateError::Config("Results file is not specified".into()));
        }
        Ok(())
    }
}

/// Grouping dimensions used by the score calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSettings {
    /// Breakdown of each severity bucket by audit status.
    pub status_grouping: String,
    /// Breakdown of the "All" bucket by exploitability class.
    pub class_grouping: String,
}

impl Default for ScoreSettings {
    fn default() -> Self {
        Self {
            status_grouping: GROUPING_ANALYSIS.to_string(),
            class_grouping: GROUPING_ANALYSIS.to_string(),
        }
    }
}

impl From<Option<&ScoringSettings>> for ScoreSettings {
    fn from(settings: Option<&ScoringSettings>) -> Self {
        let defaults = Self::default();
        match settings {
            Some(s) => Self {
                status_grouping: s.status_grouping.clone().unwrap_or(defaults.status_grouping),
                class_grouping: s.class_grouping.clone().unwrap_or(defaults.class_grouping),
            },
            None => defaults,
        }
    }
}

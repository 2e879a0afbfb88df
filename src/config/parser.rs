use std::path::Path;
use std::time::Duration;
use crate::errors::GateError;
use super::types::{
    BackendConfig, GateConfig, ScoreSettings, UploadConfig, DEFAULT_PAGE_SIZE,
    DEFAULT_POLL_INTERVAL_MINUTES,
};
use super::security::validate_security_patterns;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub const ENV_URL: &str = "FORTIFY_URL";
pub const ENV_TOKEN: &str = "FORTIFY_TOKEN";

pub async fn parse_config(path: &Path) -> Result<GateConfig, GateError> {
    if !path.exists() {
        return Err(GateError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(GateError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<GateConfig, GateError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(GateConfig::default());
    }

    validate_security_patterns(&yaml)?;
    validate_schema(&yaml)?;

    let config: GateConfig = serde_yaml::from_value(yaml)?;
    validate_conflicts(&config);

    Ok(config)
}

fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), GateError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| GateError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| GateError::Config(format!("Schema compilation error: {}", e)))?;

    let messages: Vec<String> = match compiled.validate(&json_value) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect(),
    };
    if !messages.is_empty() {
        return Err(GateError::Config(format!("Invalid configuration: {}", messages.join("; "))));
    }
    Ok(())
}

fn validate_conflicts(config: &GateConfig) {
    if let Some(upload) = &config.upload {
        if let (Some(timeout), Some(interval)) = (upload.timeout_minutes, upload.poll_interval_minutes) {
            if timeout > 0 && interval > timeout {
                warn!(timeout, interval, "Poll interval exceeds the processing timeout");
            }
        }
    }
    if let Some(backend) = &config.backend {
        if backend.token.as_deref().is_some_and(|t| !t.is_empty()) {
            warn!("Authentication token stored in config file; prefer the {} variable", ENV_TOKEN);
        }
    }
}

/// Values given on the command line. They win over the file, which wins
/// over the environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub results_file: Option<String>,
    pub results_remote: bool,
    pub filter_set: Option<String>,
    pub failure_condition: Option<String>,
    pub timeout_minutes: Option<u64>,
    pub poll_interval_minutes: Option<u64>,
}

pub fn resolve_backend(config: &GateConfig, cli: &CliOverrides) -> Result<BackendConfig, GateError> {
    resolve_backend_with_env(config, cli, |key| std::env::var(key).ok())
}

pub fn resolve_backend_with_env(
    config: &GateConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<BackendConfig, GateError> {
    let file = config.backend.clone().unwrap_or_default();
    let url = cli.url.clone()
        .or(file.url)
        .or_else(|| env(ENV_URL))
        .unwrap_or_default();
    let token = cli.token.clone()
        .or(file.token)
        .or_else(|| env(ENV_TOKEN))
        .unwrap_or_default();

    let mut backend = BackendConfig::new(&url, &token);
    backend.connect_timeout = file.connect_timeout_secs.map(Duration::from_secs);
    backend.read_timeout = file.read_timeout_secs.map(Duration::from_secs);
    backend.write_timeout = file.write_timeout_secs.map(Duration::from_secs);
    backend.proxy = file.proxy;
    backend.issue_template = file.issue_template.filter(|t| !t.trim().is_empty());
    backend.page_size = file.page_size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE);

    backend.validate()?;
    Ok(backend)
}

pub fn resolve_upload(config: &GateConfig, cli: &CliOverrides) -> Result<UploadConfig, GateError> {
    let file = config.upload.clone().unwrap_or_default();
    let poll_minutes = cli.poll_interval_minutes
        .or(file.poll_interval_minutes)
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_POLL_INTERVAL_MINUTES);
    let timeout_minutes = cli.timeout_minutes.or(file.timeout_minutes).unwrap_or(0);

    let upload = UploadConfig {
        app_name: cli.app_name.clone().or(file.app_name).unwrap_or_default().trim().to_string(),
        app_version: cli.app_version.clone().or(file.app_version).unwrap_or_default().trim().to_string(),
        results_file: cli.results_file.clone().or(file.results_file).unwrap_or_default(),
        results_remote: cli.results_remote,
        filter_set: cli.filter_set.clone().or(file.filter_set).filter(|f| !f.trim().is_empty()),
        failure_condition: cli.failure_condition.clone()
            .or(file.failure_condition)
            .filter(|c| !c.trim().is_empty()),
        timeout: Duration::from_secs(timeout_minutes * 60),
        poll_interval: Duration::from_secs(poll_minutes * 60),
    };
    upload.validate()?;
    Ok(upload)
}

pub fn resolve_scoring(config: &GateConfig) -> ScoreSettings {
    ScoreSettings::from(config.scoring.as_ref())
}

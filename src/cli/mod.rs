pub mod commands;
pub mod report;
pub mod serve;
pub mod upload;

pub use commands::{Cli, Commands};

use std::path::{Path, PathBuf};
use crate::config::{parse_config, CliOverrides, GateConfig};
use crate::errors::GateError;
use commands::CommonArgs;

pub const DEFAULT_BUILDS_DIR: &str = "./builds";

/// Config file if one was given, else an empty configuration.
pub async fn load_config(common: &CommonArgs) -> Result<GateConfig, GateError> {
    match &common.config {
        Some(path) => parse_config(Path::new(path)).await,
        None => Ok(GateConfig::default()),
    }
}

pub fn builds_dir(common: &CommonArgs, config: &GateConfig) -> PathBuf {
    common
        .builds_dir
        .clone()
        .or_else(|| config.storage.as_ref().and_then(|s| s.builds_dir.clone()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILDS_DIR))
}

pub fn overrides(common: &CommonArgs) -> CliOverrides {
    CliOverrides {
        url: common.url.clone(),
        token: common.token.clone(),
        ..Default::default()
    }
}

/// App name and version from flags, else from the `upload` section.
pub fn app_identity(
    config: &GateConfig,
    app_name: Option<&String>,
    app_version: Option<&String>,
) -> (Option<String>, Option<String>) {
    let upload = config.upload.as_ref();
    (
        app_name.cloned().or_else(|| upload.and_then(|u| u.app_name.clone())),
        app_version.cloned().or_else(|| upload.and_then(|u| u.app_version.clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageSettings, UploadSettings};

    #[test]
    fn test_builds_dir_precedence() {
        let config = GateConfig {
            storage: Some(StorageSettings { builds_dir: Some("/var/gate".into()) }),
            ..Default::default()
        };
        assert_eq!(builds_dir(&CommonArgs::default(), &config), PathBuf::from("/var/gate"));
        let common = CommonArgs { builds_dir: Some("/tmp/b".into()), ..Default::default() };
        assert_eq!(builds_dir(&common, &config), PathBuf::from("/tmp/b"));
        assert_eq!(builds_dir(&CommonArgs::default(), &GateConfig::default()), PathBuf::from(DEFAULT_BUILDS_DIR));
    }

    #[test]
    fn test_app_identity_falls_back_to_config() {
        let config = GateConfig {
            upload: Some(UploadSettings { app_name: Some("billing".into()), ..Default::default() }),
            ..Default::default()
        };
        let version = "3.0".to_string();
        let (app, ver) = app_identity(&config, None, Some(&version));
        assert_eq!(app.as_deref(), Some("billing"));
        assert_eq!(ver.as_deref(), Some("3.0"));
    }
}

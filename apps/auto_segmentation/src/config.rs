use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

use shared::protocol::DEFAULT_SOCKET_PATH;

/// Picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "auto-segmentation.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub socket_path: PathBuf,
    pub log_filter: String,
    pub mark_asynchronous: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            log_filter: "info".into(),
            mark_asynchronous: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    socket_path: Option<PathBuf>,
    log_filter: Option<String>,
    mark_asynchronous: Option<bool>,
}

pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with_env(config_path, |key| std::env::var(key).ok())
}

fn load_settings_with_env(
    config_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match config_path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        apply_file_settings(&mut settings, &raw).with_context(|| {
            format!(
                "invalid config file '{}'",
                config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE)).display()
            )
        })?;
    }

    if let Some(v) = env("DSF_SOCKET_PATH") {
        settings.socket_path = PathBuf::from(v);
    }
    if let Some(v) = env("APP__SOCKET_PATH") {
        settings.socket_path = PathBuf::from(v);
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = env("APP__MARK_ASYNCHRONOUS") {
        if let Ok(parsed) = v.trim().parse::<bool>() {
            settings.mark_asynchronous = parsed;
        }
    }

    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.socket_path {
        settings.socket_path = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.mark_asynchronous {
        settings.mark_asynchronous = v;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

use anyhow::{Context, Result, bail};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::modules::notifications::DEFAULT_EXPIRY;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    /// Time before an undismissed toast is removed.
    pub expiry_ms: u64,
    /// Oldest toasts are dismissed once more than this many are active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_visible: Option<usize>,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self { expiry_ms: DEFAULT_EXPIRY.as_millis() as u64, max_visible: None }
    }
}

impl ToastConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.expiry_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub toasts: ToastConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub path: PathBuf,
    pub toasts: ToastConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(config_path()?)
    }

    /// Reads the config at `path`, writing a default file first if none exists.
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            let default = ConfigFile::default();
            let toml = toml::to_string_pretty(&default)?;
            if let Some(parent) = path.parent() { fs::create_dir_all(parent)?; }
            fs::write(&path, toml).with_context(|| format!("Writing default config {:?}", &path))?;
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Reading {:?}", &path))?;
        let cfg: ConfigFile = toml::from_str(&content).with_context(|| "Parsing config TOML")?;
        if cfg.toasts.max_visible == Some(0) { bail!("toasts.max_visible must be at least 1 in {:?}", &path); }
        Ok(Self { path, toasts: cfg.toasts, log: cfg.log })
    }
}

fn config_path() -> Result<PathBuf> {
    let base = config_dir().context("Could not determine config directory")?;
    Ok(base.join("toastr").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(path.clone()).unwrap();

        assert!(path.exists());
        assert_eq!(config.toasts, ToastConfig::default());
        assert_eq!(config.toasts.expiry(), Duration::from_millis(5000));
        assert_eq!(config.log.level, "info");

        let reloaded = Config::load_from(path).unwrap();
        assert_eq!(reloaded.toasts, config.toasts);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[toasts]\nmax_visible = 3\n").unwrap();

        let config = Config::load_from(path).unwrap();

        assert_eq!(config.toasts.max_visible, Some(3));
        assert_eq!(config.toasts.expiry_ms, 5000);
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn zero_visible_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[toasts]\nmax_visible = 0\n").unwrap();

        let err = Config::load_from(path).unwrap_err();
        assert!(err.to_string().contains("max_visible must be at least 1"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[toasts\nexpiry_ms = ").unwrap();

        let err = Config::load_from(path).unwrap_err();
        assert!(err.to_string().contains("Parsing config TOML"));
    }
}

//! User configuration, read from `<config dir>/neotasks/config.toml`.
//!
//! Every field is optional; a missing file means defaults.

use crate::error::{Error, Result};
use crate::view::FilterMode;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = "neotasks";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the task list, theme and log live.
    pub data_dir: Option<PathBuf>,
    /// Where exports are written.
    pub export_dir: Option<PathBuf>,
    /// `RUST_LOG`-style directive used when the variable is unset.
    pub log_level: String,
    /// Filter selected when the TUI starts.
    pub default_filter: FilterMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            export_dir: None,
            log_level: "info".into(),
            default_filter: FilterMode::All,
        }
    }
}

impl Config {
    /// Load `explicit` if given (it must exist), otherwise the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.log_level)
            .map(|_| ())
            .map_err(|e| Error::Config(format!("invalid log_level '{}': {e}", self.log_level)))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".neotasks"))
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

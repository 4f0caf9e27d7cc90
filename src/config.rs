//! Persisted working directory
//!
//! The only state that survives between invocations. It is read once at
//! start-up and handed to every operation as a plain value.

use crate::core::error::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_ENV: &str = "DATASCRIBE_CONFIG";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub workdir: PathBuf,
}

impl Config {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Defaults to the current process directory.
    pub fn from_current_dir() -> Result<Self> {
        Ok(Self::new(env::current_dir()?))
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(path) = env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("datascribe")
        .join(CONFIG_FILE)
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_location() -> Self {
        Self::new(default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the config, silently recreating it when missing or malformed.
    pub fn load(&self) -> Result<Config> {
        match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<Config>(&text) {
                Ok(config) => {
                    debug!(path = %self.path.display(), "config loaded");
                    Ok(config)
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "malformed config, recreating");
                    self.recreate_default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.recreate_default(),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text =
            serde_json::to_string_pretty(config).map_err(|e| ScribeError::Config(e.to_string()))?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    /// Persists `dir` (made absolute) as the working directory.
    pub fn set_working_directory(&self, dir: &Path) -> Result<Config> {
        if !dir.exists() {
            return Err(ScribeError::PathNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(ScribeError::WrongPathType {
                path: dir.to_path_buf(),
                expected: "directory",
            });
        }

        let mut config = self.load()?;
        config.workdir = std::path::absolute(dir)?;
        self.save(&config)?;
        Ok(config)
    }

    fn recreate_default(&self) -> Result<Config> {
        let config = Config::from_current_dir()?;
        self.save(&config)?;
        Ok(config)
    }
}

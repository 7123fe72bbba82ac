//! Layered settings: built-in defaults, an optional YAML file, environment
//! variables, then command-line overrides (highest precedence).

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{history::SessionId, insight::DEFAULT_INSIGHT_TIMEOUT};

pub const CONFIG_ENV: &str = "CSV_INSIGHT_CONFIG";
pub const HISTORY_DIR_ENV: &str = "CSV_INSIGHT_HISTORY_DIR";
pub const SESSION_ENV: &str = "CSV_INSIGHT_SESSION";
pub const COMMAND_ENV: &str = "CSV_INSIGHT_COMMAND";
pub const TIMEOUT_ENV: &str = "CSV_INSIGHT_TIMEOUT";

pub const DEFAULT_HISTORY_DIR: &str = ".csv-insight/history";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub history_dir: PathBuf,
    pub session_id: Option<SessionId>,
    pub insight_command: Vec<String>,
    pub insight_timeout: Duration,
    pub save_history: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            session_id: None,
            insight_command: Vec::new(),
            insight_timeout: DEFAULT_INSIGHT_TIMEOUT,
            save_history: true,
        }
    }
}

/// Shape of the YAML config file; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub history_dir: Option<PathBuf>,
    pub session_id: Option<SessionId>,
    pub insight_command: Option<Vec<String>>,
    pub insight_timeout_secs: Option<u64>,
    pub save_history: Option<bool>,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub history_dir: Option<PathBuf>,
    pub session_id: Option<SessionId>,
    pub insight_command: Option<String>,
    pub insight_timeout_secs: Option<u64>,
    pub no_save: bool,
}

impl Settings {
    /// Resolves settings from every layer using the process environment.
    pub fn resolve(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let env_path = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut settings = Settings::default();
        if let Some(path) = config_path.map(Path::to_path_buf).or(env_path) {
            settings.apply_file(&load_file(&path)?);
            debug!("Loaded settings from {path:?}");
        }
        settings.apply_env(|key| env::var(key).ok())?;
        settings.apply_overrides(overrides);
        Ok(settings)
    }

    pub fn apply_file(&mut self, file: &FileSettings) {
        if let Some(dir) = &file.history_dir {
            self.history_dir = dir.clone();
        }
        if let Some(id) = file.session_id {
            self.session_id = Some(id);
        }
        if let Some(command) = &file.insight_command {
            self.insight_command = command.clone();
        }
        if let Some(secs) = file.insight_timeout_secs {
            self.insight_timeout = Duration::from_secs(secs);
        }
        if let Some(save) = file.save_history {
            self.save_history = save;
        }
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(HISTORY_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.history_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = lookup(SESSION_ENV).filter(|v| !v.trim().is_empty()) {
            let id = raw
                .parse::<SessionId>()
                .map_err(|err| anyhow!("Invalid {SESSION_ENV} value '{raw}': {err}"))?;
            self.session_id = Some(id);
        }
        if let Some(command) = lookup(COMMAND_ENV) {
            let parts = split_command(&command);
            if !parts.is_empty() {
                self.insight_command = parts;
            }
        }
        if let Some(raw) = lookup(TIMEOUT_ENV).filter(|v| !v.trim().is_empty()) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|err| anyhow!("Invalid {TIMEOUT_ENV} value '{raw}': {err}"))?;
            self.insight_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(dir) = &overrides.history_dir {
            self.history_dir = dir.clone();
        }
        if let Some(id) = overrides.session_id {
            self.session_id = Some(id);
        }
        if let Some(command) = &overrides.insight_command {
            self.insight_command = split_command(command);
        }
        if let Some(secs) = overrides.insight_timeout_secs {
            self.insight_timeout = Duration::from_secs(secs);
        }
        if overrides.no_save {
            self.save_history = false;
        }
    }
}

pub fn load_file(path: &Path) -> Result<FileSettings> {
    let raw = fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
    serde_yaml::from_str(&raw).with_context(|| format!("Parsing config file {path:?}"))
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

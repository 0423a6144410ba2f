use crate::app_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ENV_SCENARIO_DIR: &str = "TYPINGER_SCENARIO_DIR";
pub const ENV_OUTPUT_DIR: &str = "TYPINGER_OUTPUT_DIR";
pub const ENV_KEYMAP_DIR: &str = "TYPINGER_KEYMAP_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scenario_dir: PathBuf,
    pub output_dir: PathBuf,
    pub keymap_dir: PathBuf,
    pub default_scenario: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scenario_dir: AppDirs::scenario_dir(),
            output_dir: AppDirs::output_dir(),
            keymap_dir: AppDirs::keymap_dir(),
            default_scenario: "beginner.json".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Apply the `TYPINGER_*_DIR` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dir = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        if let Some(p) = dir(ENV_SCENARIO_DIR) {
            self.scenario_dir = p;
        }
        if let Some(p) = dir(ENV_OUTPUT_DIR) {
            self.output_dir = p;
        }
        if let Some(p) = dir(ENV_KEYMAP_DIR) {
            self.keymap_dir = p;
        }
        self
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

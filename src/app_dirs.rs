use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "typinger";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("typinger_config.json"))
    }

    fn data_dir() -> PathBuf {
        Self::project()
            .map(|pd| pd.data_local_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn scenario_dir() -> PathBuf {
        Self::data_dir().join("scenarios")
    }

    /// CSV session logs
    pub fn output_dir() -> PathBuf {
        Self::data_dir().join("output")
    }

    pub fn keymap_dir() -> PathBuf {
        Self::data_dir().join("keymaps")
    }

    /// Tracing output while the practice screen owns the terminal
    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
                .join("typinger.log")
        } else {
            Self::data_dir().join("typinger.log")
        }
    }
}

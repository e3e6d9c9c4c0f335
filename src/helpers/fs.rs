//! File System Utilities
//!
//! Configuration and data directory management, and config file loading.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{debug, info};

use crate::constants::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};
use crate::domain::AppConfig;
use crate::error::{Error, Result};

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).ok_or_else(|| Error::Invalid {
        message: "Could not determine project directories".to_string(),
    })
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(dir.to_path_buf())
}

/// Get or create the application's configuration directory
///
/// Platform-specific locations:
/// - **Linux**: `~/.config/crm-sync/` or `$XDG_CONFIG_HOME/crm-sync/`
/// - **macOS**: `~/Library/Application Support/com.crm.crm-sync/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\crm\crm-sync\config\`
pub fn get_or_create_config_dir() -> Result<PathBuf> {
    ensure_dir(project_dirs()?.config_dir())
}

/// Get or create the data directory (log files)
///
/// Platform-specific locations:
/// - **Linux**: `~/.local/share/crm-sync/`
/// - **macOS**: `~/Library/Application Support/com.crm.crm-sync/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\crm\crm-sync\data\`
pub fn get_or_create_data_dir() -> Result<PathBuf> {
    ensure_dir(project_dirs()?.data_dir())
}

/// Load configuration
///
/// An explicit `path` must exist. Without one, `config.toml` in the config
/// directory is used when present, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = get_or_create_config_dir()?.join(CONFIG_FILE_NAME);
            if !default.exists() {
                debug!(path = %default.display(), "no config file, using defaults");
                return Ok(AppConfig::default());
            }
            default
        }
    };

    let content = fs::read_to_string(&path)?;
    let config = AppConfig::from_toml(&content)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Write `config` to `path`, creating parent directories
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, config.to_toml()?)?;
    Ok(())
}

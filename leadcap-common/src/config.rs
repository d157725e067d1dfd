//! Configuration loading and data folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable consulted for the data folder location
pub const DATA_FOLDER_ENV: &str = "LEADCAP_DATA_FOLDER";

/// File name of the SQLite database inside the data folder
pub const DATABASE_FILE_NAME: &str = "leads.db";

/// Data folder resolution priority order:
/// 1. Explicit argument (highest priority)
/// 2. `LEADCAP_DATA_FOLDER` environment variable
/// 3. TOML config file (`data_folder` key)
/// 4. OS-dependent compiled default (fallback)
///
/// Missing or unreadable config files degrade to the next priority level;
/// resolution never fails outright.
pub fn resolve_data_folder(explicit: Option<&str>) -> PathBuf {
    // Priority 1: explicit argument
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        match std::fs::read_to_string(&config_path) {
            Ok(toml_content) => {
                if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                    if let Some(folder) = config.get("data_folder").and_then(|v| v.as_str()) {
                        return PathBuf::from(folder);
                    }
                }
            }
            Err(e) => {
                warn!("Could not read config file {}: {}", config_path.display(), e);
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// Locate the configuration file for the platform
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("leadcap").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/leadcap/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("leadcap"))
        .unwrap_or_else(|| PathBuf::from("./leadcap_data"))
}

/// Full path of the SQLite database inside a data folder
pub fn database_path(data_folder: &Path) -> PathBuf {
    data_folder.join(DATABASE_FILE_NAME)
}

/// Create the data folder if it does not exist (idempotent)
pub fn ensure_data_folder(data_folder: &Path) -> Result<()> {
    std::fs::create_dir_all(data_folder)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_argument_wins() {
        let folder = resolve_data_folder(Some("/tmp/leadcap-explicit"));
        assert_eq!(folder, PathBuf::from("/tmp/leadcap-explicit"));
    }

    #[test]
    fn test_database_path_joins_file_name() {
        let db = database_path(Path::new("/var/lib/leadcap"));
        assert_eq!(db, PathBuf::from("/var/lib/leadcap/leads.db"));
    }

    #[test]
    fn test_default_data_folder_is_nonempty() {
        let folder = default_data_folder();
        assert!(!folder.as_os_str().is_empty());
    }
}

//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Database file path inside the root folder.
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("tipline.db")
}

/// Get default configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    let config_path = if cfg!(target_os = "linux") {
        // Try ~/.config/tipline/config.toml first, then /etc/tipline/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("tipline").join("config.toml"));
        let system_config = PathBuf::from("/etc/tipline/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else {
        dirs::config_dir()
            .map(|d| d.join("tipline").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    };

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {:?}",
            config_path
        )))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/tipline (or /var/lib/tipline for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("tipline"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/tipline"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/tipline
        dirs::data_dir()
            .map(|d| d.join("tipline"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/tipline"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\tipline
        dirs::data_local_dir()
            .map(|d| d.join("tipline"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tipline"))
    } else {
        PathBuf::from("./tipline_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn cli_arg_wins_over_env() {
        std::env::set_var("TIPLINE_TEST_ROOT_A", "/from/env");
        let root = resolve_root_folder(Some("/from/cli"), "TIPLINE_TEST_ROOT_A").unwrap();
        assert_eq!(root, PathBuf::from("/from/cli"));
        std::env::remove_var("TIPLINE_TEST_ROOT_A");
    }

    #[test]
    #[serial_test::serial]
    fn env_wins_when_no_cli_arg() {
        std::env::set_var("TIPLINE_TEST_ROOT_B", "/from/env");
        let root = resolve_root_folder(None, "TIPLINE_TEST_ROOT_B").unwrap();
        assert_eq!(root, PathBuf::from("/from/env"));
        std::env::remove_var("TIPLINE_TEST_ROOT_B");
    }

    #[test]
    #[serial_test::serial]
    fn falls_back_to_platform_default() {
        std::env::remove_var("TIPLINE_TEST_ROOT_C");
        let root = resolve_root_folder(None, "TIPLINE_TEST_ROOT_C").unwrap();
        // Either the platform default or a config-file value; both end with
        // a tipline-owned directory name on stock systems.
        assert!(!root.as_os_str().is_empty());
    }

    #[test]
    fn database_lives_inside_root() {
        let db = database_path(Path::new("/data/tipline"));
        assert_eq!(db, PathBuf::from("/data/tipline/tipline.db"));
    }
}

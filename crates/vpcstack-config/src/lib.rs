pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// Environment variable pointing directly at a settings file
pub const CONFIG_PATH_ENV: &str = "VPCSTACK_CONFIG_PATH";

/// Environment variable holding the key pair name
pub const KEY_PAIR_ENV: &str = "key_pair_file_name";

/// Per-project working directory
pub const PROJECT_DIR: &str = ".vpcstack";

const CANDIDATES: [&str; 4] = [
    "stack.local.kdl",
    ".stack.local.kdl",
    "stack.kdl",
    ".stack.kdl",
];

/// vpcstack's global config directory (`~/.config/vpcstack`)
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("vpcstack"))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// Find the project's stack.kdl, starting from the current directory
///
/// Search order:
/// 1. `VPCSTACK_CONFIG_PATH` (direct path)
/// 2. current directory: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl
/// 3. `./.vpcstack/`, same order
/// 4. `~/.config/vpcstack/stack.kdl`
pub fn find_settings_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_settings_file_in(&current_dir)
}

/// [`find_settings_file`] rooted at `root` instead of the current directory
pub fn find_settings_file_in(root: &Path) -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at missing file {}", CONFIG_PATH_ENV, path.display());
    }

    for filename in &CANDIDATES {
        let path = root.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = root.join(PROJECT_DIR);
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Ok(dir) = config_dir() {
        let global = dir.join("stack.kdl");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::SettingsFileNotFound)
}

/// Key pair name from `key_pair_file_name`; unset or blank yields `None`
pub fn key_pair_from_env() -> Option<String> {
    std::env::var(KEY_PAIR_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Directory synthesized documents are written to
pub fn output_dir(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join(PROJECT_DIR).join("out")
}

//! Filesystem adapters for shopchat.
//!
//! Data directory layout and the JSON-file implementation of the
//! `SessionStore` trait from `shopchat-core`.

pub mod session_store;

use std::path::{Path, PathBuf};

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "SHOPCHAT_DATA_DIR";

/// Compute the stored session path: `{data_dir}/session.json`.
pub fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session.json")
}

/// Compute the config file path: `{data_dir}/config.toml`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SHOPCHAT_DATA_DIR` environment variable
/// 2. `~/.shopchat` under the home directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".shopchat");
    }

    // Last resort: current directory
    PathBuf::from(".shopchat")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_paths() {
        let data_dir = PathBuf::from("/home/user/.shopchat");
        assert_eq!(
            session_path(&data_dir),
            PathBuf::from("/home/user/.shopchat/session.json")
        );
        assert_eq!(
            config_path(&data_dir),
            PathBuf::from("/home/user/.shopchat/config.toml")
        );
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-shopchat");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-shopchat"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}

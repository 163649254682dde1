/// Centralized platform-specific path computation
///
/// Follows the XDG Base Directory specification on Linux and the native
/// locations on macOS and Windows (via the `dirs` crate).
use std::path::{Component, Path, PathBuf};

const APP_DIR: &str = "chunkyard";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate data directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_DATA_HOME or ~/.local/share
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {data_dir}/chunkyard
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/chunkyard
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Get default task database path
    ///
    /// Returns: {data_dir}/chunkyard/tasks.sqlite
    pub fn default_task_db_path() -> PathBuf {
        Self::project_data_dir().join("tasks.sqlite")
    }

    /// Get default config file path
    ///
    /// Returns: {config_dir}/chunkyard/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

/// Render a path relative to `root` with `/` separators.
///
/// Chunk file paths use this form on every platform so ids and query results
/// do not depend on the host separator.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize a caller-supplied file path against a project root.
///
/// Absolute paths under the root and `./`-prefixed or backslash-separated
/// relative paths all map to the stored `/`-separated form. Absolute paths
/// outside the root have no stored form and yield `None`.
pub fn normalize_file_path(root: &Path, file_path: &str) -> Option<String> {
    let candidate = Path::new(file_path);
    if candidate.is_absolute() {
        return candidate
            .strip_prefix(root)
            .ok()
            .map(|relative| relative_slash_path(Path::new(""), relative));
    }
    Some(
        file_path
            .replace('\\', "/")
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/"),
    )
}

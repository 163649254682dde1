/// Configuration system for chunkyard
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ChunkyardError, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Project indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Task queue configuration
    #[serde(default)]
    pub tasks: TaskConfig,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Maximum file size to index (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Maximum chunk content length in characters before a chunk is split
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Glob patterns a file must match (empty matches everything)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Glob patterns or path fragments that exclude a file
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Index files that only the whole-file extractor can handle
    #[serde(default = "default_whole_file_fallback")]
    pub whole_file_fallback: bool,
}

/// Task queue backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskBackend {
    /// Durable SQLite database shared by every process on the host
    Sqlite,
    /// Process-local queue, lost on exit
    Memory,
}

/// Task queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_task_backend")]
    pub backend: TaskBackend,

    /// SQLite database path
    #[serde(default = "default_task_db_path")]
    pub db_path: PathBuf,

    /// How long a writer waits on a locked database before giving up
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

// Default value functions
fn default_max_file_size() -> usize {
    1_048_576 // 1 MB
}

fn default_max_chunk_size() -> usize {
    10_000
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "target".to_string(),
        "node_modules".to_string(),
        ".git".to_string(),
        ".venv".to_string(),
        "__pycache__".to_string(),
        "build".to_string(),
    ]
}

fn default_whole_file_fallback() -> bool {
    true
}

fn default_task_backend() -> TaskBackend {
    TaskBackend::Sqlite
}

fn default_task_db_path() -> PathBuf {
    crate::paths::PlatformPaths::default_task_db_path()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_max_connections() -> u32 {
    5
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_chunk_size: default_max_chunk_size(),
            include_patterns: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
            whole_file_fallback: default_whole_file_fallback(),
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            backend: default_task_backend(),
            db_path: default_task_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            max_connections: default_max_connections(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, ChunkyardError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, ChunkyardError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ChunkyardError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ChunkyardError> {
        if self.indexing.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "indexing.max_file_size".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        // Leaves room for the split-part notice plus at least one line
        if self.indexing.max_chunk_size < 200 {
            return Err(ConfigError::InvalidValue {
                key: "indexing.max_chunk_size".to_string(),
                reason: format!(
                    "must be at least 200, got {}",
                    self.indexing.max_chunk_size
                ),
            }
            .into());
        }

        if self.tasks.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tasks.max_connections".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.tasks.backend == TaskBackend::Sqlite && self.tasks.db_path.as_os_str().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                key: "tasks.db_path".to_string(),
                reason: "must not be empty for the sqlite backend".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CHUNKYARD_DB_PATH") {
            self.tasks.db_path = PathBuf::from(path);
        }

        if let Ok(backend) = std::env::var("CHUNKYARD_TASK_BACKEND") {
            match backend.to_lowercase().as_str() {
                "sqlite" => self.tasks.backend = TaskBackend::Sqlite,
                "memory" => self.tasks.backend = TaskBackend::Memory,
                other => tracing::warn!("Ignoring unknown CHUNKYARD_TASK_BACKEND '{}'", other),
            }
        }

        if let Ok(timeout) = std::env::var("CHUNKYARD_BUSY_TIMEOUT_MS")
            && let Ok(ms) = timeout.parse()
        {
            self.tasks.busy_timeout_ms = ms;
        }

        if let Ok(size) = std::env::var("CHUNKYARD_MAX_FILE_SIZE")
            && let Ok(size) = size.parse()
        {
            self.indexing.max_file_size = size;
        }

        if let Ok(size) = std::env::var("CHUNKYARD_MAX_CHUNK_SIZE")
            && let Ok(size) = size.parse()
        {
            self.indexing.max_chunk_size = size;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, ChunkyardError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

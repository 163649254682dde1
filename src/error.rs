/// Centralized error types for chunkyard using thiserror
///
/// Separates what a caller must see (lookups that miss, task-state violations)
/// from internal degradations such as extraction fallbacks.
use thiserror::Error;

/// Main error type for chunkyard
#[derive(Error, Debug)]
pub enum ChunkyardError {
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Lookups of an unknown project, chunk or task
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("project '{0}' is not configured")]
    Project(String),

    #[error("chunk '{chunk_id}' does not exist in project '{project_id}'")]
    Chunk {
        project_id: String,
        chunk_id: String,
    },

    #[error("chunk '{0}' does not exist")]
    ChunkId(String),

    #[error("task '{0}' does not exist")]
    Task(String),
}

/// Errors raised by the task queue
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task '{task_id}' is {status}, expected {expected}")]
    InvalidState {
        task_id: String,
        status: String,
        expected: String,
    },

    #[error("task store is busy, retry the operation: {0}")]
    ConcurrencyConflict(String),

    #[error("task storage failed: {0}")]
    Storage(String),

    #[error("task database version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: String, found: String },

    #[error("failed to (de)serialize task field: {0}")]
    Serialization(String),
}

/// Errors produced by a specialized chunk extractor
///
/// These never reach callers of `configure`; the extractor set turns them
/// into a whole-file fallback for the affected file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("failed to parse '{path}': {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("unsupported language for '{0}'")]
    UnsupportedLanguage(String),

    #[error("no hunks found in patch '{0}'")]
    NoHunks(String),
}

/// Errors related to enumerating project files
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to walk directory: {0}")]
    WalkFailed(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("Empty {0}")]
    Empty(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl From<anyhow::Error> for ChunkyardError {
    fn from(err: anyhow::Error) -> Self {
        ChunkyardError::Other(format!("{:#}", err))
    }
}

impl From<sqlx::Error> for TaskError {
    fn from(err: sqlx::Error) -> Self {
        // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes,
        // that outlived the busy timeout
        if let sqlx::Error::Database(db_err) = &err
            && let Some(code) = db_err.code()
            && let Ok(code) = code.parse::<i32>()
            && matches!(code & 0xff, 5 | 6)
        {
            return TaskError::ConcurrencyConflict(db_err.message().to_string());
        }
        if let sqlx::Error::PoolTimedOut = err {
            return TaskError::ConcurrencyConflict("connection pool timed out".to_string());
        }
        TaskError::Storage(err.to_string())
    }
}

impl From<sqlx::Error> for ChunkyardError {
    fn from(err: sqlx::Error) -> Self {
        ChunkyardError::Task(err.into())
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Serialization(err.to_string())
    }
}

impl ChunkyardError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        ChunkyardError::Other(msg.into())
    }

    /// Convert to a user-facing error string suitable for tool responses
    pub fn to_user_string(&self) -> String {
        format!("{}", self)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ChunkyardError::NotFound(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, ChunkyardError::Task(TaskError::InvalidState { .. }))
    }

    /// Check if this is a user error (validation, not found, bad transition) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ChunkyardError::Validation(_)
                | ChunkyardError::NotFound(_)
                | ChunkyardError::Task(TaskError::InvalidState { .. })
                | ChunkyardError::Config(ConfigError::InvalidValue { .. })
        )
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChunkyardError::Task(TaskError::ConcurrencyConflict(_)) | ChunkyardError::Io(_)
        )
    }
}

/// Result alias used across the library surface
pub type Result<T, E = ChunkyardError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err: ChunkyardError = NotFoundError::Project("demo-1234abcd".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Not found: project 'demo-1234abcd' is not configured"
        );
        assert!(err.is_not_found());
        assert!(err.is_user_error());
    }

    #[test]
    fn test_chunk_not_found_display() {
        let err = NotFoundError::Chunk {
            project_id: "p".to_string(),
            chunk_id: "main_0123456789".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "chunk 'main_0123456789' does not exist in project 'p'"
        );
    }

    #[test]
    fn test_invalid_state_display() {
        let err: ChunkyardError = TaskError::InvalidState {
            task_id: "abc".to_string(),
            status: "open".to_string(),
            expected: "claimed".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Task error: task 'abc' is open, expected claimed"
        );
        assert!(err.is_invalid_state());
        assert!(!err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_concurrency_conflict_is_retryable() {
        let err: ChunkyardError = TaskError::ConcurrencyConflict("database is locked".into()).into();
        assert!(err.is_retryable());
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChunkyardError = io_err.into();
        assert!(matches!(err, ChunkyardError::Io(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: ChunkyardError = anyhow::anyhow!("walk failed").context("configure").into();
        match err {
            ChunkyardError::Other(msg) => assert_eq!(msg, "configure: walk failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schema_mismatch_display() {
        let err = TaskError::SchemaVersionMismatch {
            expected: "1".to_string(),
            found: "0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "task database version mismatch: expected 1, found 0"
        );
    }

    #[test]
    fn test_extraction_error_display() {
        let err = ExtractionError::ParseFailed {
            path: "src/app.py".to_string(),
            reason: "syntax error near line 3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse 'src/app.py': syntax error near line 3"
        );
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            key: "tasks.backend".to_string(),
            reason: "must be 'sqlite' or 'memory'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for 'tasks.backend': must be 'sqlite' or 'memory'"
        );
    }

    #[test]
    fn test_other() {
        let err = ChunkyardError::other("custom error message");
        assert_eq!(err.to_user_string(), "custom error message");
    }
}

//! Durable task queue backed by SQLite
//!
//! Every process that opens the same file shares one queue. The database
//! runs in WAL mode so readers never block the single writer, and every
//! state transition is one conditional `UPDATE ... RETURNING` statement.

use super::{FollowUp, NewTask, Task, TaskQueue, TaskStatus};
use crate::error::{ChunkyardError, NotFoundError, Result, TaskError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Version recorded in the `db_version` table
pub const SCHEMA_VERSION: &str = "1";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS db_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open'
        CHECK (status IN ('open', 'claimed', 'done')),
    priority INTEGER NOT NULL DEFAULT 0,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    claimed_at TEXT,
    completed_at TEXT,
    outcome_note TEXT,
    follow_up TEXT
        CHECK (follow_up IS NULL OR follow_up IN ('no_followup', 'low', 'medium', 'high'))
);

CREATE INDEX IF NOT EXISTS idx_tasks_claim_order
    ON tasks (status, priority DESC, created_at, seq);
"#;

const TASK_COLUMNS: &str = "id, description, status, priority, metadata, created_at, \
     claimed_at, completed_at, outcome_note, follow_up";

pub struct SqliteTaskQueue {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteTaskQueue {
    /// Open (creating if needed) the queue database at `path`
    ///
    /// The parent directory is created on first use. Fails with
    /// `SchemaVersionMismatch` when the file was written by an incompatible
    /// schema.
    pub async fn open(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
        max_connections: u32,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(busy_timeout)
            .foreign_keys(true)
            .pragma("cache_size", "-20000");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(busy_timeout.max(Duration::from_secs(5)))
            .connect_with(options)
            .await
            .map_err(TaskError::from)?;

        let queue = Self { pool, path };
        queue.init_schema().await?;
        tracing::info!("Opened task database at {}", queue.path.display());
        Ok(queue)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(TaskError::from)?;

        sqlx::query("INSERT OR IGNORE INTO db_version (id, version) VALUES (1, ?)")
            .bind(SCHEMA_VERSION)
            .execute(&self.pool)
            .await
            .map_err(TaskError::from)?;

        let found: String = sqlx::query_scalar("SELECT version FROM db_version WHERE id = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(TaskError::from)?;

        if found != SCHEMA_VERSION {
            return Err(TaskError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found,
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn add(&self, new_task: NewTask) -> Result<Task> {
        let id = Uuid::new_v4().to_string();
        let metadata = serde_json::to_string(&new_task.metadata).map_err(TaskError::from)?;

        let row = sqlx::query(&format!(
            "INSERT INTO tasks (id, description, status, priority, metadata, created_at) \
             VALUES (?, ?, 'open', ?, ?, ?) RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(&id)
        .bind(&new_task.description)
        .bind(new_task.priority)
        .bind(metadata)
        .bind(timestamp(Utc::now()))
        .fetch_one(&self.pool)
        .await
        .map_err(TaskError::from)?;

        let task = task_from_row(&row)?;
        tracing::info!("Added task {} (priority {})", task.id, task.priority);
        Ok(task)
    }

    async fn claim_next(&self) -> Result<Option<Task>> {
        // Selection and transition happen in one statement; the status guard
        // makes a lost race update zero rows instead of double-claiming
        let row = sqlx::query(&format!(
            "UPDATE tasks SET status = 'claimed', claimed_at = ? \
             WHERE seq = ( \
                 SELECT seq FROM tasks WHERE status = 'open' \
                 ORDER BY priority DESC, created_at ASC, seq ASC LIMIT 1 \
             ) AND status = 'open' \
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(timestamp(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(TaskError::from)?;

        let Some(row) = row else {
            tracing::debug!("No open task to claim");
            return Ok(None);
        };
        let task = task_from_row(&row)?;
        tracing::info!("Claimed task {}", task.id);
        Ok(Some(task))
    }

    async fn complete(
        &self,
        task_id: &str,
        outcome_note: &str,
        follow_up: Option<FollowUp>,
    ) -> Result<Task> {
        let row = sqlx::query(&format!(
            "UPDATE tasks SET status = 'done', completed_at = ?, outcome_note = ?, follow_up = ? \
             WHERE id = ? AND status = 'claimed' \
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(timestamp(Utc::now()))
        .bind(outcome_note)
        .bind(follow_up.map(|f| f.as_str()))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(TaskError::from)?;

        if let Some(row) = row {
            let task = task_from_row(&row)?;
            tracing::info!("Completed task {}", task.id);
            return Ok(task);
        }

        // Nothing updated: tell an unknown id apart from a wrong state
        let current = self.get(task_id).await?;
        Err(TaskError::InvalidState {
            task_id: task_id.to_string(),
            status: current.status.to_string(),
            expected: TaskStatus::Claimed.to_string(),
        }
        .into())
    }

    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {} FROM tasks WHERE status = ? ORDER BY created_at ASC, seq ASC",
                    TASK_COLUMNS
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM tasks ORDER BY created_at ASC, seq ASC",
                    TASK_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(TaskError::from)?;

        rows.iter().map(task_from_row).collect()
    }

    async fn get(&self, task_id: &str) -> Result<Task> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(TaskError::from)?;

        match row {
            Some(row) => task_from_row(&row),
            None => Err(NotFoundError::Task(task_id.to_string()).into()),
        }
    }
}

/// Fixed-width UTC timestamps sort lexicographically in time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, TaskError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TaskError::Serialization(format!("bad timestamp '{}': {}", raw, e)))
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let decode = |e: sqlx::Error| ChunkyardError::from(TaskError::from(e));

    let status: String = row.try_get("status").map_err(decode)?;
    let metadata: String = row.try_get("metadata").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let claimed_at: Option<String> = row.try_get("claimed_at").map_err(decode)?;
    let completed_at: Option<String> = row.try_get("completed_at").map_err(decode)?;
    let follow_up: Option<String> = row.try_get("follow_up").map_err(decode)?;

    Ok(Task {
        id: row.try_get("id").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        status: status.parse().map_err(TaskError::Serialization)?,
        priority: row.try_get("priority").map_err(decode)?,
        metadata: serde_json::from_str(&metadata).map_err(TaskError::from)?,
        created_at: parse_timestamp(&created_at)?,
        claimed_at: claimed_at.as_deref().map(parse_timestamp).transpose()?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
        outcome_note: row.try_get("outcome_note").map_err(decode)?,
        follow_up: follow_up
            .as_deref()
            .map(FollowUp::from_str)
            .transpose()
            .map_err(TaskError::Serialization)?,
    })
}

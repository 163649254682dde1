//! Global task queue with a race-free claim
//!
//! Two backends implement [`TaskQueue`]: [`SqliteTaskQueue`] is durable and
//! shared by every process that opens the same database file, while
//! [`MemoryTaskQueue`] lives inside one process.
//!
//! A task moves strictly `open -> claimed -> done`. Claiming is a single
//! conditional transition, so two callers never walk away with the same task.

mod memory;
mod sqlite;

pub use memory::MemoryTaskQueue;
pub use sqlite::{SCHEMA_VERSION, SqliteTaskQueue};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Claimed,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Claimed => "claimed",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "claimed" => Ok(TaskStatus::Claimed),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!(
                "unknown task status '{}', expected open, claimed or done",
                other
            )),
        }
    }
}

/// How urgently a completed task needs a human to look at it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FollowUp {
    NoFollowup,
    Low,
    Medium,
    High,
}

impl FollowUp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUp::NoFollowup => "no_followup",
            FollowUp::Low => "low",
            FollowUp::Medium => "medium",
            FollowUp::High => "high",
        }
    }
}

impl fmt::Display for FollowUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FollowUp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "no_followup" | "none" => Ok(FollowUp::NoFollowup),
            "low" => Ok(FollowUp::Low),
            "medium" => Ok(FollowUp::Medium),
            "high" => Ok(FollowUp::High),
            other => Err(format!(
                "unknown follow-up '{}', expected no_followup, low, medium or high",
                other
            )),
        }
    }
}

/// A unit of work in the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    /// UUID v4, never reused
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
    /// Higher values are claimed first
    pub priority: i64,
    /// Free-form JSON object supplied when the task was added
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Set once the task leaves `open`
    pub claimed_at: Option<DateTime<Utc>>,
    /// Set once the task is `done`
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome_note: Option<String>,
    pub follow_up: Option<FollowUp>,
}

/// Input for [`TaskQueue::add`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub description: String,
    pub metadata: serde_json::Value,
    pub priority: i64,
}

impl NewTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            metadata: serde_json::Value::Object(Default::default()),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Queue interface shared by the durable and in-memory backends
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Append a new open task
    async fn add(&self, task: NewTask) -> Result<Task>;

    /// Atomically move the best open task to `claimed`
    ///
    /// Best means highest priority, then oldest `created_at`, then earliest
    /// insertion. Returns `None` when nothing is open.
    async fn claim_next(&self) -> Result<Option<Task>>;

    /// Move a claimed task to `done`
    ///
    /// Fails with `NotFound` for unknown ids and `InvalidState` unless the
    /// task is currently claimed.
    async fn complete(
        &self,
        task_id: &str,
        outcome_note: &str,
        follow_up: Option<FollowUp>,
    ) -> Result<Task>;

    /// Tasks ordered by `created_at` then insertion, optionally by status
    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>>;

    async fn get(&self, task_id: &str) -> Result<Task>;
}

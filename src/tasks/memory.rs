//! In-process task queue

use super::{FollowUp, NewTask, Task, TaskQueue, TaskStatus};
use crate::error::{NotFoundError, Result, TaskError};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Queue held in process memory
///
/// Tasks are kept in insertion order, so a task's index doubles as its
/// insertion sequence. Every operation holds the mutex only for its own
/// select-and-transition.
#[derive(Default)]
pub struct MemoryTaskQueue {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn add(&self, new_task: NewTask) -> Result<Task> {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            description: new_task.description,
            status: TaskStatus::Open,
            priority: new_task.priority,
            metadata: new_task.metadata,
            created_at: Utc::now(),
            claimed_at: None,
            completed_at: None,
            outcome_note: None,
            follow_up: None,
        };

        self.tasks.lock().await.push(task.clone());
        tracing::info!("Added task {} (priority {})", task.id, task.priority);
        Ok(task)
    }

    async fn claim_next(&self) -> Result<Option<Task>> {
        let mut tasks = self.tasks.lock().await;

        let best = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == TaskStatus::Open)
            .max_by_key(|(seq, t)| (t.priority, Reverse(t.created_at), Reverse(*seq)))
            .map(|(seq, _)| seq);

        let Some(seq) = best else {
            return Ok(None);
        };

        let task = &mut tasks[seq];
        task.status = TaskStatus::Claimed;
        task.claimed_at = Some(Utc::now());
        tracing::info!("Claimed task {}", task.id);
        Ok(Some(task.clone()))
    }

    async fn complete(
        &self,
        task_id: &str,
        outcome_note: &str,
        follow_up: Option<FollowUp>,
    ) -> Result<Task> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| NotFoundError::Task(task_id.to_string()))?;

        if task.status != TaskStatus::Claimed {
            return Err(TaskError::InvalidState {
                task_id: task_id.to_string(),
                status: task.status.to_string(),
                expected: TaskStatus::Claimed.to_string(),
            }
            .into());
        }

        task.status = TaskStatus::Done;
        task.completed_at = Some(Utc::now());
        task.outcome_note = Some(outcome_note.to_string());
        task.follow_up = follow_up;
        tracing::info!("Completed task {}", task.id);
        Ok(task.clone())
    }

    async fn list(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let tasks = self.tasks.lock().await;
        let mut selected: Vec<(usize, Task)> = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| status.is_none_or(|s| t.status == s))
            .map(|(seq, t)| (seq, t.clone()))
            .collect();
        drop(tasks);

        selected.sort_by_key(|(seq, t)| (t.created_at, *seq));
        Ok(selected.into_iter().map(|(_, t)| t).collect())
    }

    async fn get(&self, task_id: &str) -> Result<Task> {
        self.tasks
            .lock()
            .await
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(|| NotFoundError::Task(task_id.to_string()).into())
    }
}

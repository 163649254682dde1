/// Integration tests for the task queue across handles and restarts
use anyhow::Result;
use chunkyard::error::{ChunkyardError, TaskError};
use chunkyard::tasks::{
    FollowUp, MemoryTaskQueue, NewTask, SCHEMA_VERSION, SqliteTaskQueue, TaskQueue, TaskStatus,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn open(path: &Path) -> Result<SqliteTaskQueue> {
    Ok(SqliteTaskQueue::open(path, Duration::from_secs(10), 4).await?)
}

/// Claim from every handle until the queue is drained, returning claimed ids
async fn drain_concurrently(handles: Vec<Arc<dyn TaskQueue>>, claimers: usize) -> Vec<String> {
    let mut joins = Vec::new();
    for i in 0..claimers {
        let queue = handles[i % handles.len()].clone();
        joins.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(task) = queue.claim_next().await.unwrap() {
                assert_eq!(task.status, TaskStatus::Claimed);
                claimed.push(task.id);
            }
            claimed
        }));
    }

    let mut all = Vec::new();
    for join in joins {
        all.extend(join.await.unwrap());
    }
    all
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_claim_exclusive_across_sqlite_handles() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("tasks.sqlite");

    // Independent handles stand in for separate processes
    let mut handles: Vec<Arc<dyn TaskQueue>> = Vec::new();
    for _ in 0..3 {
        handles.push(Arc::new(open(&db).await?));
    }

    let mut added = HashSet::new();
    for i in 0..60 {
        let task = handles[i % 3]
            .add(NewTask::new(format!("task {}", i)).with_priority((i % 4) as i64))
            .await?;
        added.insert(task.id);
    }

    let claimed = drain_concurrently(handles.clone(), 8).await;

    let unique: HashSet<_> = claimed.iter().cloned().collect();
    assert_eq!(claimed.len(), 60, "every task claimed exactly once");
    assert_eq!(unique, added);

    let still_open = handles[0].list(Some(TaskStatus::Open)).await?;
    assert!(still_open.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_claim_exclusive_in_memory() -> Result<()> {
    let queue: Arc<dyn TaskQueue> = Arc::new(MemoryTaskQueue::new());
    for i in 0..100 {
        queue.add(NewTask::new(format!("task {}", i))).await?;
    }

    let claimed = drain_concurrently(vec![queue.clone()], 16).await;
    let unique: HashSet<_> = claimed.iter().collect();
    assert_eq!(claimed.len(), 100);
    assert_eq!(unique.len(), 100);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completion_has_one_winner() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("tasks.sqlite");
    let a = Arc::new(open(&db).await?);
    let b = Arc::new(open(&db).await?);

    let task = a.add(NewTask::new("race me")).await?;
    a.claim_next().await?;

    let (first, second) = tokio::join!(
        a.complete(&task.id, "from a", Some(FollowUp::Low)),
        b.complete(&task.id, "from b", Some(FollowUp::High)),
    );

    let outcomes = [first, second];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.is_invalid_state())
    );

    let stored = a.get(&task.id).await?;
    assert_eq!(stored.status, TaskStatus::Done);
    Ok(())
}

#[tokio::test]
async fn test_tasks_survive_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("tasks.sqlite");

    let (open_id, done_id) = {
        let queue = open(&db).await?;
        let done = queue.add(NewTask::new("finished")).await?;
        let open_task = queue
            .add(NewTask::new("pending").with_metadata(serde_json::json!({"k": 1})))
            .await?;
        queue.claim_next().await?;
        queue.complete(&done.id, "ok", Some(FollowUp::Medium)).await?;
        queue.close().await;
        (open_task.id, done.id)
    };

    let queue = open(&db).await?;
    let done = queue.get(&done_id).await?;
    assert_eq!(done.status, TaskStatus::Done);
    assert_eq!(done.outcome_note.as_deref(), Some("ok"));
    assert_eq!(done.follow_up, Some(FollowUp::Medium));

    let pending = queue.get(&open_id).await?;
    assert_eq!(pending.status, TaskStatus::Open);
    assert_eq!(pending.metadata, serde_json::json!({"k": 1}));

    let claimed = queue.claim_next().await?.expect("open task after reopen");
    assert_eq!(claimed.id, open_id);
    Ok(())
}

#[tokio::test]
async fn test_schema_version_mismatch() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("tasks.sqlite");

    open(&db).await?.close().await;

    let pool =
        sqlx::SqlitePool::connect_with(sqlx::sqlite::SqliteConnectOptions::new().filename(&db))
            .await?;
    sqlx::query("UPDATE db_version SET version = '999' WHERE id = 1")
        .execute(&pool)
        .await?;
    pool.close().await;

    let err = match open(&db).await {
        Ok(_) => panic!("opening a newer schema must fail"),
        Err(e) => e.downcast::<ChunkyardError>()?,
    };
    match err {
        ChunkyardError::Task(TaskError::SchemaVersionMismatch { expected, found }) => {
            assert_eq!(expected, SCHEMA_VERSION);
            assert_eq!(found, "999");
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_state_monotonicity() -> Result<()> {
    let dir = TempDir::new()?;
    let queue = open(&dir.path().join("tasks.sqlite")).await?;

    let task = queue.add(NewTask::new("one way")).await?;
    let claimed = queue.claim_next().await?.expect("claimable");
    let done = queue.complete(&task.id, "note", None).await?;

    assert!(claimed.claimed_at.is_some() && claimed.completed_at.is_none());
    assert!(done.claimed_at.is_some() && done.completed_at.is_some());
    assert!(done.completed_at >= done.claimed_at);
    assert!(done.claimed_at >= Some(done.created_at));

    // Done is terminal: no reclaim and no second completion
    assert!(queue.claim_next().await?.is_none());
    assert!(
        queue
            .complete(&task.id, "again", Some(FollowUp::High))
            .await
            .unwrap_err()
            .is_invalid_state()
    );
    assert_eq!(queue.get(&task.id).await?, done);
    Ok(())
}

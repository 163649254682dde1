//! Core library client for chunkyard
//!
//! [`ChunkyardClient`] is the tool-facing surface: every external call maps
//! to one method here, which validates its request and dispatches to the
//! project registry, the query engine or the task queue.

use crate::config::{Config, TaskBackend};
use crate::error::{ChunkyardError, NotFoundError, Result};
use crate::query::{ChunkFilter, QueryEngine};
use crate::registry::{ProjectRegistry, ProjectSummary};
use crate::tasks::{MemoryTaskQueue, NewTask, SqliteTaskQueue, Task, TaskQueue};
use crate::types::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main client for chunk queries and the task queue
///
/// Cheap to clone; clones share the registry and the queue.
///
/// # Example
///
/// ```no_run
/// use chunkyard::{ChunkyardClient, ConfigureProjectRequest, ListFilesRequest};
///
/// #[tokio::main]
/// async fn main() -> chunkyard::Result<()> {
///     let client = ChunkyardClient::new().await?;
///
///     let configured = client
///         .configure_project(ConfigureProjectRequest {
///             root_path: "/path/to/project".to_string(),
///             project_id: None,
///         })
///         .await?;
///
///     let files = client
///         .list_files_by_chunk_type_and_contents(ListFilesRequest {
///             project_id: configured.project_id,
///             chunk_type: None,
///             text_filter: vec!["auth".to_string()],
///             filter_on: Default::default(),
///         })
///         .await?;
///     println!("{:?}", files.files);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ChunkyardClient {
    pub(crate) registry: Arc<ProjectRegistry>,
    pub(crate) tasks: Arc<dyn TaskQueue>,
    pub(crate) config: Arc<Config>,
}

impl ChunkyardClient {
    /// Create a client from the config file, environment and defaults
    pub async fn new() -> Result<Self> {
        let config = Config::new()?;
        Self::with_config(config).await
    }

    /// Create a client with a custom configuration
    pub async fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        tracing::info!("Initializing chunkyard client");
        tracing::debug!("Task backend: {:?}", config.tasks.backend);
        tracing::debug!("Max chunk size: {}", config.indexing.max_chunk_size);

        let tasks: Arc<dyn TaskQueue> = match config.tasks.backend {
            TaskBackend::Sqlite => Arc::new(
                SqliteTaskQueue::open(
                    &config.tasks.db_path,
                    Duration::from_millis(config.tasks.busy_timeout_ms),
                    config.tasks.max_connections,
                )
                .await?,
            ),
            TaskBackend::Memory => Arc::new(MemoryTaskQueue::new()),
        };

        Ok(Self::with_parts(config, tasks))
    }

    /// Assemble a client around an existing queue
    pub fn with_parts(config: Config, tasks: Arc<dyn TaskQueue>) -> Self {
        Self {
            registry: Arc::new(ProjectRegistry::new(config.indexing.clone())),
            tasks,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn task_queue(&self) -> &Arc<dyn TaskQueue> {
        &self.tasks
    }

    /// Index a directory and publish it as a project
    pub async fn configure_project(
        &self,
        request: ConfigureProjectRequest,
    ) -> Result<ConfigureProjectResponse> {
        request.validate()?;
        let start = Instant::now();

        let (project, stats) = self
            .registry
            .configure(&request.root_path, request.project_id)
            .await?;

        Ok(ConfigureProjectResponse {
            project_id: project.id.clone(),
            root_path: project.root.display().to_string(),
            file_count: stats.file_count,
            chunk_count: stats.chunk_count,
            fallback_count: stats.fallback_count,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Re-read a configured project from disk
    pub async fn refresh_project(&self, project_id: &str) -> Result<ConfigureProjectResponse> {
        let start = Instant::now();
        let (project, stats) = self.registry.refresh(project_id).await?;

        Ok(ConfigureProjectResponse {
            project_id: project.id.clone(),
            root_path: project.root.display().to_string(),
            file_count: stats.file_count,
            chunk_count: stats.chunk_count,
            fallback_count: stats.fallback_count,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    pub async fn drop_project(&self, project_id: &str) -> Result<()> {
        self.registry.drop_project(project_id).await
    }

    pub async fn list_projects(&self) -> Vec<ProjectSummary> {
        self.registry.list().await
    }

    /// Files with a chunk matching the optional type and text filters
    pub async fn list_files_by_chunk_type_and_contents(
        &self,
        request: ListFilesRequest,
    ) -> Result<ListFilesResponse> {
        request.validate()?;
        let engine = self.query_engine(&request.project_id).await?;

        let filter = ChunkFilter {
            chunk_type: request.chunk_type,
            text: request.text_filter,
            target: request.filter_on,
        };
        Ok(ListFilesResponse {
            files: engine.files_matching(&filter),
        })
    }

    pub async fn list_all_files_in_project(
        &self,
        request: ListProjectFilesRequest,
    ) -> Result<ListProjectFilesResponse> {
        request.validate()?;
        let engine = self.query_engine(&request.project_id).await?;
        if request.compact {
            return Ok(ListProjectFilesResponse {
                files: Vec::new(),
                tree: Some(engine.file_tree(&request.path_filter)),
            });
        }
        Ok(ListProjectFilesResponse {
            files: engine.list_files(&request.path_filter),
            tree: None,
        })
    }

    pub async fn list_chunk_names_in_file(
        &self,
        request: ListChunkNamesRequest,
    ) -> Result<ListChunkNamesResponse> {
        request.validate()?;
        let engine = self.query_engine(&request.project_id).await?;
        Ok(ListChunkNamesResponse {
            chunks: engine.chunk_names_in_file(&request.file_path),
        })
    }

    pub async fn get_chunk_details(&self, request: GetChunkRequest) -> Result<ChunkDetails> {
        request.validate()?;
        let project = self.registry.get(&request.project_id).await?;

        let chunk = project.store.get(&request.chunk_id).map_err(|_| NotFoundError::Chunk {
            project_id: request.project_id.clone(),
            chunk_id: request.chunk_id.clone(),
        })?;

        Ok(ChunkDetails {
            id: chunk.id.clone(),
            content: chunk.content.clone(),
            file_path: chunk.file_path.clone(),
            chunk_type: chunk.chunk_type,
            name: chunk.name.clone(),
            line_span: chunk.line_span,
        })
    }

    pub async fn add_task(&self, request: AddTaskRequest) -> Result<AddTaskResponse> {
        request.validate()?;

        let mut new_task = NewTask::new(request.description);
        if let Some(metadata) = request.metadata {
            new_task = new_task.with_metadata(metadata);
        }
        if let Some(priority) = request.priority {
            new_task = new_task.with_priority(priority);
        }

        let task = self.tasks.add(new_task).await?;
        Ok(AddTaskResponse { task_id: task.id })
    }

    pub async fn claim_next_task(&self) -> Result<ClaimTaskResponse> {
        let task = self.tasks.claim_next().await?;
        Ok(ClaimTaskResponse { task })
    }

    pub async fn complete_task(&self, request: CompleteTaskRequest) -> Result<Task> {
        request.validate()?;
        self.tasks
            .complete(&request.task_id, &request.outcome_note, request.follow_up)
            .await
    }

    pub async fn list_tasks(&self, request: ListTasksRequest) -> Result<ListTasksResponse> {
        let tasks = self.tasks.list(request.status).await?;
        Ok(ListTasksResponse { tasks })
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        if task_id.trim().is_empty() {
            return Err(ChunkyardError::Validation(
                crate::error::ValidationError::Empty("task_id".to_string()),
            ));
        }
        self.tasks.get(task_id).await
    }

    /// Query engine over the project's current snapshot
    async fn query_engine(&self, project_id: &str) -> Result<QueryEngine> {
        let project = self.registry.get(project_id).await?;
        Ok(QueryEngine::new(&project.root, project.store.snapshot()))
    }
}

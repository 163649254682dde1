use crate::error::ValidationError;
use crate::indexer::{ChunkType, LineSpan};
use crate::query::{ChunkSummary, FileSummary, FilterTarget};
use crate::tasks::{FollowUp, Task, TaskStatus};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn require(value: &str, what: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(what.to_string()));
    }
    Ok(())
}

/// Request to index a directory as a project
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfigureProjectRequest {
    /// Path to the project root directory
    pub root_path: String,
    /// Optional project id; derived from the canonical root when omitted
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ConfigureProjectRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.root_path, "root_path")?;
        if let Some(id) = &self.project_id
            && id.trim().is_empty()
        {
            return Err(ValidationError::InvalidProjectId(
                "project id must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Response from configuring a project
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfigureProjectResponse {
    pub project_id: String,
    /// Canonical root the project was indexed from
    pub root_path: String,
    pub file_count: usize,
    pub chunk_count: usize,
    /// Files whose specialized extractor failed and fell back to whole-file chunks
    pub fallback_count: usize,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// Request to find files by chunk type and/or text
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesRequest {
    pub project_id: String,
    /// Only consider chunks of this type
    #[serde(default)]
    pub chunk_type: Option<ChunkType>,
    /// Case-insensitive substrings; a chunk matches if it contains any of them
    #[serde(default)]
    pub text_filter: Vec<String>,
    /// Which chunk fields the text filter applies to (default: name_or_content)
    #[serde(default)]
    pub filter_on: FilterTarget,
}

impl ListFilesRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.project_id, "project_id")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesResponse {
    /// Matching file paths relative to the project root, sorted
    pub files: Vec<String>,
}

/// Request to list every indexed file of a project
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListProjectFilesRequest {
    pub project_id: String,
    /// Case-insensitive path substrings; any may match
    #[serde(default)]
    pub path_filter: Vec<String>,
    /// Return a compact text tree instead of per-file summaries
    #[serde(default)]
    pub compact: bool,
}

impl ListProjectFilesRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.project_id, "project_id")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListProjectFilesResponse {
    /// Per-file summaries; empty when a compact tree was requested
    pub files: Vec<FileSummary>,
    /// Paths grouped by directory, only for compact requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<String>,
}

/// Request for the chunk names of one file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListChunkNamesRequest {
    pub project_id: String,
    /// Relative to the project root, or absolute under it
    pub file_path: String,
}

impl ListChunkNamesRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.project_id, "project_id")?;
        require(&self.file_path, "file_path")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListChunkNamesResponse {
    /// Chunks in extraction order; empty for unknown files
    pub chunks: Vec<ChunkSummary>,
}

/// Request for one chunk's full content
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetChunkRequest {
    pub project_id: String,
    pub chunk_id: String,
}

impl GetChunkRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.project_id, "project_id")?;
        require(&self.chunk_id, "chunk_id")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChunkDetails {
    pub id: String,
    pub content: String,
    pub file_path: String,
    pub chunk_type: ChunkType,
    pub name: String,
    pub line_span: LineSpan,
}

/// Request to enqueue a task
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddTaskRequest {
    pub description: String,
    /// Free-form JSON object stored with the task
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Higher runs first (default: 0)
    #[serde(default)]
    pub priority: Option<i64>,
}

impl AddTaskRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.description, "description")?;
        if let Some(metadata) = &self.metadata
            && !metadata.is_object()
        {
            return Err(ValidationError::InvalidValue(
                "metadata must be a JSON object".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddTaskResponse {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimTaskResponse {
    /// None when no task is open
    pub task: Option<Task>,
}

/// Request to mark a claimed task done
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompleteTaskRequest {
    pub task_id: String,
    pub outcome_note: String,
    #[serde(default)]
    pub follow_up: Option<FollowUp>,
}

impl CompleteTaskRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.task_id, "task_id")?;
        require(&self.outcome_note, "outcome_note")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListTasksRequest {
    /// Only tasks in this status
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListTasksResponse {
    pub tasks: Vec<Task>,
}

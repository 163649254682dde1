//! # chunkyard - Addressable File Chunks and a Shared Task Queue
//!
//! A local engine for tool-calling agents. It turns the files of a project
//! into named, addressable chunks that can be listed and fetched by id, and
//! runs a task queue whose claim is race-free across threads and processes.
//!
//! ## Key Features
//!
//! - **Chunk Extraction**: Python, Markdown, Vue, unified diffs and a dozen
//!   tree-sitter languages, with a whole-file fallback for everything else
//! - **Stable Ids**: chunk ids derive from path, type, name and ordinal, so
//!   re-indexing unchanged files yields identical ids
//! - **Atomic Rebuilds**: readers see a complete old or a complete new store
//! - **Durable Task Queue**: SQLite in WAL mode shared by every process on
//!   the host, with a single-statement claim
//!
//! ## Architecture
//!
//! ```text
//!            ChunkyardClient
//!        ┌──────────┼────────────┐
//!        │          │            │
//!  ProjectRegistry  QueryEngine  TaskQueue
//!        │          │            ├─ SqliteTaskQueue
//!    ChunkStore ◄───┘            └─ MemoryTaskQueue
//!        │
//!   ExtractorSet (python, tree_sitter, markdown, vue, diff, whole_file)
//! ```
//!
//! ## Modules
//!
//! - [`client`]: the tool-facing façade
//! - [`registry`]: project id -> chunk store lifecycle
//! - [`store`]: per-project chunk storage with snapshot swaps
//! - [`query`]: filtered searches over a store snapshot
//! - [`tasks`]: task records and the queue backends
//! - [`indexer`]: file walking and chunk extractors
//! - [`config`]: configuration with environment variable overrides
//! - [`types`]: request/response types with JSON schema
//! - [`error`]: error types and result aliases
//! - [`paths`]: platform directories and path normalization
//!
//! ## Usage Example
//!
//! ```no_run
//! use chunkyard::{AddTaskRequest, ChunkyardClient};
//!
//! #[tokio::main]
//! async fn main() -> chunkyard::Result<()> {
//!     let client = ChunkyardClient::new().await?;
//!
//!     client
//!         .add_task(AddTaskRequest {
//!             description: "review the auth module".to_string(),
//!             metadata: None,
//!             priority: Some(1),
//!         })
//!         .await?;
//!
//!     if let Some(task) = client.claim_next_task().await?.task {
//!         println!("working on {}", task.description);
//!     }
//!     Ok(())
//! }
//! ```

/// Tool-facing client
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// Include/exclude path patterns
pub mod glob_utils;

/// File walking and chunk extractors
pub mod indexer;

/// Platform directories and path normalization
pub mod paths;

/// Filtered searches over one project's chunks
pub mod query;

/// Project id -> chunk store registry
pub mod registry;

/// Per-project chunk storage
pub mod store;

/// Task records and queue backends
pub mod tasks;

/// Request/response types with JSON schema definitions
pub mod types;

pub use client::ChunkyardClient;
pub use config::Config;
pub use error::{ChunkyardError, Result};
pub use indexer::{Chunk, ChunkType, LineSpan};
pub use tasks::{FollowUp, Task, TaskQueue, TaskStatus};
pub use types::*;

//! Project registry: project id -> chunk store
//!
//! Configuring a project walks its root and builds a fresh store off to the
//! side, then publishes it under the project id in one map write. Readers
//! holding the previous `Arc<Project>` keep a complete view of the old
//! contents until they drop it.
//!
//! Rebuilds of one project id run one at a time, in the order they were
//! requested, so a slow walk that started earlier can never publish over a
//! newer one.

use crate::config::IndexingConfig;
use crate::error::{ChunkyardError, IndexingError, NotFoundError, Result, ValidationError};
use crate::indexer::{ExtractorSet, FileWalker, SourceFile};
use crate::store::{ChunkStore, RebuildStats};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A configured project and its chunks
pub struct Project {
    pub id: String,
    /// Canonical root directory
    pub root: PathBuf,
    pub store: Arc<ChunkStore>,
    pub configured_at: DateTime<Utc>,
}

/// Listing entry for a configured project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSummary {
    pub project_id: String,
    pub root_path: String,
    pub file_count: usize,
    pub chunk_count: usize,
    pub configured_at: DateTime<Utc>,
}

impl Project {
    pub fn summary(&self) -> ProjectSummary {
        let snapshot = self.store.snapshot();
        ProjectSummary {
            project_id: self.id.clone(),
            root_path: self.root.display().to_string(),
            file_count: snapshot.file_count(),
            chunk_count: snapshot.chunk_count(),
            configured_at: self.configured_at,
        }
    }
}

/// Explicit registry value, empty on creation
pub struct ProjectRegistry {
    projects: RwLock<HashMap<String, Arc<Project>>>,
    /// Per-project-id gate held across walk, rebuild and publish
    rebuild_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    indexing: IndexingConfig,
    extractors: Arc<ExtractorSet>,
}

impl ProjectRegistry {
    pub fn new(indexing: IndexingConfig) -> Self {
        let extractors = Arc::new(ExtractorSet::from_config(&indexing));
        Self {
            projects: RwLock::new(HashMap::new()),
            rebuild_locks: Mutex::new(HashMap::new()),
            indexing,
            extractors,
        }
    }

    /// Index `root` and publish it, replacing any project with the same id
    ///
    /// Without an explicit id the id is derived from the canonical root, so
    /// configuring the same directory twice lands on the same project.
    pub async fn configure(
        &self,
        root: impl AsRef<Path>,
        project_id: Option<String>,
    ) -> Result<(Arc<Project>, RebuildStats)> {
        let root = canonical_root(root.as_ref())?;
        let id = match project_id {
            Some(id) => {
                let id = id.trim().to_string();
                if id.is_empty() {
                    return Err(ValidationError::InvalidProjectId(
                        "project id must not be blank".to_string(),
                    )
                    .into());
                }
                id
            }
            None => derive_project_id(&root),
        };

        let lock = self.rebuild_lock(&id).await;
        let _guard = lock.lock().await;
        tracing::info!("Configuring project {} at {}", id, root.display());

        let store = Arc::new(ChunkStore::new(self.extractors.clone()));
        let stats = self.rebuild_store(&root, store.clone()).await?;

        let project = Arc::new(Project {
            id: id.clone(),
            root,
            store,
            configured_at: Utc::now(),
        });

        let replaced = self
            .projects
            .write()
            .await
            .insert(id.clone(), project.clone())
            .is_some();

        tracing::info!(
            "Project {} ready: {} files, {} chunks, {} fallbacks{}",
            id,
            stats.file_count,
            stats.chunk_count,
            stats.fallback_count,
            if replaced { " (replaced previous)" } else { "" }
        );
        Ok((project, stats))
    }

    pub async fn get(&self, project_id: &str) -> Result<Arc<Project>> {
        self.projects
            .read()
            .await
            .get(project_id)
            .cloned()
            .ok_or_else(|| NotFoundError::Project(project_id.to_string()).into())
    }

    /// Re-read an existing project from disk and swap its store contents
    pub async fn refresh(&self, project_id: &str) -> Result<(Arc<Project>, RebuildStats)> {
        let lock = self.rebuild_lock(project_id).await;
        let _guard = lock.lock().await;
        let project = self.get(project_id).await?;
        tracing::info!("Refreshing project {}", project.id);
        let stats = self.rebuild_store(&project.root, project.store.clone()).await?;
        Ok((project, stats))
    }

    pub async fn drop_project(&self, project_id: &str) -> Result<()> {
        let lock = self.rebuild_lock(project_id).await;
        let _guard = lock.lock().await;
        match self.projects.write().await.remove(project_id) {
            Some(_) => {
                tracing::info!("Dropped project {}", project_id);
                Ok(())
            }
            None => Err(NotFoundError::Project(project_id.to_string()).into()),
        }
    }

    /// Summaries of all configured projects, sorted by id
    pub async fn list(&self) -> Vec<ProjectSummary> {
        let projects: Vec<Arc<Project>> = self.projects.read().await.values().cloned().collect();
        let mut summaries: Vec<_> = projects.iter().map(|p| p.summary()).collect();
        summaries.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        summaries
    }

    async fn rebuild_lock(&self, project_id: &str) -> Arc<Mutex<()>> {
        self.rebuild_locks
            .lock()
            .await
            .entry(project_id.to_string())
            .or_default()
            .clone()
    }

    /// Walk `root` and rebuild `store` on the blocking pool
    async fn rebuild_store(&self, root: &Path, store: Arc<ChunkStore>) -> Result<RebuildStats> {
        let files = self.collect_files(root).await?;
        tokio::task::spawn_blocking(move || store.rebuild(files))
            .await
            .map_err(|e| ChunkyardError::other(format!("rebuild task failed: {}", e)))
    }

    async fn collect_files(&self, root: &Path) -> Result<Vec<SourceFile>> {
        let walker = FileWalker::new(root, self.indexing.max_file_size).with_patterns(
            self.indexing.include_patterns.clone(),
            self.indexing.exclude_patterns.clone(),
        );
        let extractors = self.extractors.clone();

        let files = tokio::task::spawn_blocking(move || walker.walk())
            .await
            .map_err(|e| ChunkyardError::other(format!("file walk task failed: {}", e)))?
            .map_err(|e| IndexingError::WalkFailed(format!("{:#}", e)))?;

        let total = files.len();
        let files: Vec<SourceFile> = files
            .into_iter()
            .filter(|f| extractors.has_capable_extractor(&f.path))
            .collect();
        if files.len() < total {
            tracing::debug!(
                "{} of {} files have no capable extractor",
                total - files.len(),
                total
            );
        }
        Ok(files)
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(IndexingError::DirectoryNotFound(root.display().to_string()).into());
    }
    if !root.is_dir() {
        return Err(IndexingError::NotADirectory(root.display().to_string()).into());
    }
    Ok(root.canonicalize()?)
}

/// `<dir name>-<first 8 hex of sha256(canonical root)>`
pub fn derive_project_id(canonical_root: &Path) -> String {
    let digest = Sha256::digest(canonical_root.to_string_lossy().as_bytes());
    let hash: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    let dir = canonical_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "project".to_string());
    format!("{}-{}", dir, hash)
}

//! Chunk store: one project's chunks, keyed by id and by file
//!
//! The contents live in an immutable [`StoreSnapshot`]. A rebuild prepares a
//! complete new snapshot off to the side and then swaps it in, so readers see
//! either the old contents or the new ones and never a mix.

use crate::error::NotFoundError;
use crate::indexer::{Chunk, ExtractorSet, SourceFile};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::sync::{Arc, RwLock};

/// Per-file bookkeeping of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Positions of the file's chunks in [`StoreSnapshot::chunks`]
    pub range: Range<usize>,
    pub language: Option<String>,
    /// Extractor whose output was kept
    pub extractor: &'static str,
    pub fell_back: bool,
}

/// Immutable view of a store's contents at one point in time
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    /// File path ascending, extraction order within a file
    chunks: Vec<Arc<Chunk>>,
    by_id: HashMap<String, usize>,
    files: BTreeMap<String, FileEntry>,
}

impl StoreSnapshot {
    /// Assemble a snapshot from per-file extraction results
    fn build(extractions: Vec<(SourceFile, crate::indexer::FileExtraction)>) -> Self {
        let mut sorted = extractions;
        sorted.sort_by(|a, b| a.0.relative_path.cmp(&b.0.relative_path));

        let mut snapshot = StoreSnapshot::default();
        let mut taken: HashSet<String> = HashSet::new();

        for (file, extraction) in sorted {
            let start = snapshot.chunks.len();
            for mut chunk in extraction.chunks {
                if !taken.insert(chunk.id.clone()) {
                    let base = chunk.id.clone();
                    let mut n = 1;
                    while taken.contains(&format!("{}-{}", base, n)) {
                        n += 1;
                    }
                    chunk.id = format!("{}-{}", base, n);
                    tracing::warn!(
                        "Duplicate chunk id {} in {}, stored as {}",
                        base,
                        file.relative_path,
                        chunk.id
                    );
                    taken.insert(chunk.id.clone());
                }
                snapshot
                    .by_id
                    .insert(chunk.id.clone(), snapshot.chunks.len());
                snapshot.chunks.push(Arc::new(chunk));
            }
            snapshot.files.insert(
                file.relative_path,
                FileEntry {
                    range: start..snapshot.chunks.len(),
                    language: file.language,
                    extractor: extraction.extractor,
                    fell_back: extraction.fell_back,
                },
            );
        }

        snapshot
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Chunk>> {
        self.by_id.get(id).map(|&i| &self.chunks[i])
    }

    /// Every chunk, file path ascending then extraction order
    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// Chunks of one file in extraction order (empty for unknown paths)
    pub fn chunks_in_file(&self, file_path: &str) -> &[Arc<Chunk>] {
        self.files
            .get(file_path)
            .map(|entry| &self.chunks[entry.range.clone()])
            .unwrap_or(&[])
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.files.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn file_entry(&self, file_path: &str) -> Option<&FileEntry> {
        self.files.get(file_path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Files whose specialized extractor failed
    pub fn fallback_count(&self) -> usize {
        self.files.values().filter(|e| e.fell_back).count()
    }
}

/// Lazy, restartable iteration over all chunks of a snapshot
///
/// Owns its snapshot, so a concurrent rebuild does not affect it.
#[derive(Debug, Clone)]
pub struct AllChunks {
    snapshot: Arc<StoreSnapshot>,
    position: usize,
}

impl Iterator for AllChunks {
    type Item = Arc<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.snapshot.chunks.get(self.position)?.clone();
        self.position += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.snapshot.chunks.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AllChunks {}

/// Counters reported after a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildStats {
    pub file_count: usize,
    pub chunk_count: usize,
    pub fallback_count: usize,
}

pub struct ChunkStore {
    extractors: Arc<ExtractorSet>,
    current: RwLock<Arc<StoreSnapshot>>,
}

impl ChunkStore {
    /// Create an empty store
    pub fn new(extractors: Arc<ExtractorSet>) -> Self {
        Self {
            extractors,
            current: RwLock::new(Arc::new(StoreSnapshot::default())),
        }
    }

    /// Re-run extraction over `files` and replace the entire contents
    ///
    /// CPU-bound; callers on an async runtime should use `spawn_blocking`.
    pub fn rebuild(&self, files: Vec<SourceFile>) -> RebuildStats {
        let extractions: Vec<_> = files
            .into_par_iter()
            .map(|file| {
                let extraction = self
                    .extractors
                    .extract_file(&file.relative_path, &file.content);
                (file, extraction)
            })
            .collect();

        let snapshot = Arc::new(StoreSnapshot::build(extractions));
        let stats = RebuildStats {
            file_count: snapshot.file_count(),
            chunk_count: snapshot.chunk_count(),
            fallback_count: snapshot.fallback_count(),
        };

        // A poisoned lock only means a reader panicked; the Arc inside is intact
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = snapshot;
        drop(current);

        tracing::debug!(
            "Rebuilt chunk store: {} files, {} chunks, {} fallbacks",
            stats.file_count,
            stats.chunk_count,
            stats.fallback_count
        );
        stats
    }

    /// Current contents; stays valid across later rebuilds
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get(&self, id: &str) -> Result<Arc<Chunk>, NotFoundError> {
        self.snapshot()
            .get(id)
            .cloned()
            .ok_or_else(|| NotFoundError::ChunkId(id.to_string()))
    }

    pub fn all_chunks(&self) -> AllChunks {
        AllChunks {
            snapshot: self.snapshot(),
            position: 0,
        }
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.snapshot().file_paths().map(str::to_string).collect()
    }

    pub fn chunks_in_file(&self, file_path: &str) -> Vec<Arc<Chunk>> {
        self.snapshot().chunks_in_file(file_path).to_vec()
    }

    pub fn file_count(&self) -> usize {
        self.snapshot().file_count()
    }

    pub fn chunk_count(&self) -> usize {
        self.snapshot().chunk_count()
    }

    pub fn fallback_count(&self) -> usize {
        self.snapshot().fallback_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ChunkType;

    fn store() -> ChunkStore {
        ChunkStore::new(Arc::new(ExtractorSet::default()))
    }

    fn sample_files() -> Vec<SourceFile> {
        vec![
            SourceFile::new("src/app.py", "import os\n\ndef main():\n    pass\n"),
            SourceFile::new("README.md", "# Intro\nhello\n# Usage\nrun\n"),
            SourceFile::new("notes.txt", "plain text\n"),
        ]
    }

    #[test]
    fn test_empty_store() {
        let store = store();
        assert_eq!(store.chunk_count(), 0);
        assert_eq!(store.all_chunks().count(), 0);
        assert!(store.get("missing").is_err());
    }

    #[test]
    fn test_rebuild_and_get() {
        let store = store();
        let stats = store.rebuild(sample_files());

        assert_eq!(stats.file_count, 3);
        assert_eq!(stats.chunk_count, 2 + 1 + 3);
        assert_eq!(stats.fallback_count, 0);

        for chunk in store.all_chunks() {
            let fetched = store.get(&chunk.id).unwrap();
            assert_eq!(fetched, chunk);
        }
    }

    #[test]
    fn test_get_unknown_id() {
        let store = store();
        store.rebuild(sample_files());
        assert_eq!(
            store.get("nope_0000000000").unwrap_err(),
            NotFoundError::ChunkId("nope_0000000000".to_string())
        );
    }

    #[test]
    fn test_all_chunks_ordering() {
        let store = store();
        store.rebuild(sample_files());

        let order: Vec<(String, String)> = store
            .all_chunks()
            .map(|c| (c.file_path.clone(), c.name.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("README.md".to_string(), "Intro".to_string()),
                ("README.md".to_string(), "Usage".to_string()),
                ("notes.txt".to_string(), "<file_chunk_1>".to_string()),
                ("src/app.py".to_string(), "<imports>".to_string()),
                (
                    "src/app.py".to_string(),
                    "<module_level_statements>".to_string()
                ),
                ("src/app.py".to_string(), "main".to_string()),
            ]
        );
    }

    #[test]
    fn test_all_chunks_is_restartable_and_sized() {
        let store = store();
        store.rebuild(sample_files());

        let iter = store.all_chunks();
        assert_eq!(iter.len(), 6);
        let first: Vec<_> = iter.clone().map(|c| c.id.clone()).collect();
        let second: Vec<_> = iter.map(|c| c.id.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunks_in_file() {
        let store = store();
        store.rebuild(sample_files());

        let chunks = store.chunks_in_file("src/app.py");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chunk_type, ChunkType::Imports);
        assert_eq!(chunks[2].chunk_type, ChunkType::Callable);
        assert!(store.chunks_in_file("missing.py").is_empty());
        assert_eq!(
            store.file_paths(),
            vec!["README.md", "notes.txt", "src/app.py"]
        );
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let store = store();
        store.rebuild(sample_files());
        let before: Vec<Chunk> = store.all_chunks().map(|c| (*c).clone()).collect();

        store.rebuild(sample_files());
        let after: Vec<Chunk> = store.all_chunks().map(|c| (*c).clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let store = store();
        store.rebuild(sample_files());
        let old_snapshot = store.snapshot();

        store.rebuild(vec![SourceFile::new("only.md", "# Only\n")]);

        assert_eq!(store.file_paths(), vec!["only.md"]);
        assert_eq!(store.chunk_count(), 1);
        // A snapshot taken earlier still sees the complete old contents
        assert_eq!(old_snapshot.file_count(), 3);
        assert_eq!(old_snapshot.chunk_count(), 6);
    }

    #[test]
    fn test_fallback_counted() {
        let store = store();
        let stats = store.rebuild(vec![SourceFile::new("bad.py", "def broken(:\n")]);
        assert_eq!(stats.fallback_count, 1);

        let snapshot = store.snapshot();
        let entry = snapshot.file_entry("bad.py").unwrap();
        assert!(entry.fell_back);
        assert_eq!(entry.extractor, "whole_file");
        assert_eq!(entry.language, Some("Python".to_string()));
    }

    #[test]
    fn test_ids_unique_within_store() {
        let store = store();
        store.rebuild(sample_files());
        let ids: HashSet<_> = store.all_chunks().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), store.chunk_count());
    }
}

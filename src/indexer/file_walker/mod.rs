//! File walking functionality for directory traversal

use super::language::detect_language;
use crate::glob_utils::PathMatcher;
use crate::paths::relative_slash_path;
use anyhow::Result;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// A project file read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated
    pub relative_path: String,
    pub extension: Option<String>,
    pub language: Option<String>,
    pub content: String,
}

impl SourceFile {
    /// Build an in-memory file, mostly useful for tests and benches
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let path = PathBuf::from(&relative_path);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let language = extension.as_deref().and_then(detect_language);
        Self {
            path,
            relative_path,
            extension,
            language,
            content: content.into(),
        }
    }
}

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) max_file_size: usize,
    pub(crate) include_patterns: Vec<String>,
    pub(crate) exclude_patterns: Vec<String>,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>, max_file_size: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size,
            include_patterns: vec![],
            exclude_patterns: vec![],
        }
    }

    pub fn with_patterns(
        mut self,
        include_patterns: Vec<String>,
        exclude_patterns: Vec<String>,
    ) -> Self {
        self.include_patterns = include_patterns;
        self.exclude_patterns = exclude_patterns;
        self
    }

    /// Walk the directory and collect all eligible files, sorted by relative path
    pub fn walk(&self) -> Result<Vec<SourceFile>> {
        // Verify root directory exists
        if !self.root.exists() {
            anyhow::bail!("Root directory does not exist: {:?}", self.root);
        }
        if !self.root.is_dir() {
            anyhow::bail!("Root path is not a directory: {:?}", self.root);
        }

        let include = PathMatcher::new(&self.include_patterns);
        let exclude = PathMatcher::new(&self.exclude_patterns);
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(true) // Respect .gitignore, .ignore, etc.
            .hidden(false) // Don't skip hidden files by default
            .git_ignore(true) // Respect .gitignore files
            .git_exclude(true) // Respect .git/info/exclude
            .git_global(true) // Respect global gitignore
            .require_git(false) // Don't require a .git directory
            .sort_by_file_path(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            // Skip directories
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            // Explicitly skip .git directory contents
            if path.components().any(|c| c.as_os_str() == ".git") {
                continue;
            }

            let relative_path = relative_slash_path(&self.root, path);

            // Apply include/exclude patterns
            if !self.matches_patterns(&include, &exclude, &relative_path) {
                tracing::debug!("Skipping filtered file: {}", relative_path);
                continue;
            }

            // Check file size
            if let Ok(metadata) = fs::metadata(path)
                && metadata.len() > self.max_file_size as u64
            {
                tracing::debug!("Skipping large file: {}", relative_path);
                continue;
            }

            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {}: {}", relative_path, e);
                    continue;
                }
            };

            if !is_text(&bytes) {
                tracing::debug!("Skipping binary file: {}", relative_path);
                continue;
            }

            let content = match String::from_utf8(bytes) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!(
                        "Skipping file that can't be read as UTF-8: {}: {}",
                        relative_path,
                        e
                    );
                    continue;
                }
            };

            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());
            let language = extension.as_deref().and_then(detect_language);

            files.push(SourceFile {
                path: path.to_path_buf(),
                relative_path,
                extension,
                language,
                content,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        tracing::info!("Found {} files under {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Include patterns (if any) must match and no exclude pattern may
    pub(crate) fn matches_patterns(
        &self,
        include: &PathMatcher,
        exclude: &PathMatcher,
        relative_path: &str,
    ) -> bool {
        (include.is_empty() || include.matches(relative_path)) && !exclude.matches(relative_path)
    }
}

/// Simple heuristic: if 30% or more of the bytes are control characters
/// other than whitespace, the file is binary
pub(crate) fn is_text(content: &[u8]) -> bool {
    if content.is_empty() {
        return true;
    }
    let non_printable = content
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();

    (non_printable as f64 / content.len() as f64) < 0.3
}

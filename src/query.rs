//! Filtered linear searches over one chunk store snapshot
//!
//! No ranking and no stemming: results come back in store order, file path
//! ascending then extraction order.

use crate::indexer::{ChunkType, LineSpan};
use crate::paths::normalize_file_path;
use crate::store::StoreSnapshot;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

/// Which chunk fields a text filter is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterTarget {
    Name,
    Content,
    #[default]
    NameOrContent,
}

/// Chunk-level filter; an empty filter matches every chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkFilter {
    pub chunk_type: Option<ChunkType>,
    /// Case-insensitive substrings, any of which may match
    pub text: Vec<String>,
    pub target: FilterTarget,
}

impl ChunkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_type(mut self, chunk_type: ChunkType) -> Self {
        self.chunk_type = Some(chunk_type);
        self
    }

    pub fn with_text(mut self, needle: impl Into<String>) -> Self {
        self.text.push(needle.into());
        self
    }

    pub fn with_target(mut self, target: FilterTarget) -> Self {
        self.target = target;
        self
    }

    fn compile(&self) -> CompiledFilter {
        CompiledFilter {
            chunk_type: self.chunk_type,
            needles: self
                .text
                .iter()
                .filter(|n| !n.is_empty())
                .map(|n| n.to_lowercase())
                .collect(),
            target: self.target,
        }
    }
}

struct CompiledFilter {
    chunk_type: Option<ChunkType>,
    needles: Vec<String>,
    target: FilterTarget,
}

impl CompiledFilter {
    fn matches(&self, chunk: &crate::indexer::Chunk) -> bool {
        if self.chunk_type.is_some_and(|t| t != chunk.chunk_type) {
            return false;
        }
        if self.needles.is_empty() {
            return true;
        }

        let name = matches!(self.target, FilterTarget::Name | FilterTarget::NameOrContent)
            .then(|| chunk.name.to_lowercase());
        let content = matches!(
            self.target,
            FilterTarget::Content | FilterTarget::NameOrContent
        )
        .then(|| chunk.content.to_lowercase());

        self.needles.iter().any(|needle| {
            name.as_deref().is_some_and(|n| n.contains(needle.as_str()))
                || content.as_deref().is_some_and(|c| c.contains(needle.as_str()))
        })
    }
}

/// Name-level view of a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChunkSummary {
    pub id: String,
    pub name: String,
    pub chunk_type: ChunkType,
    pub line_span: LineSpan,
}

/// One indexed file with its chunk count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileSummary {
    pub file_path: String,
    pub language: Option<String>,
    pub chunk_count: usize,
}

/// Query operations bound to one snapshot of a project
pub struct QueryEngine {
    root: std::path::PathBuf,
    snapshot: Arc<StoreSnapshot>,
}

impl QueryEngine {
    pub fn new(root: impl AsRef<Path>, snapshot: Arc<StoreSnapshot>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            snapshot,
        }
    }

    /// Distinct files with at least one chunk matching the filter
    pub fn files_matching(&self, filter: &ChunkFilter) -> Vec<String> {
        let compiled = filter.compile();
        let files: BTreeSet<&str> = self
            .snapshot
            .chunks()
            .iter()
            .filter(|chunk| compiled.matches(chunk))
            .map(|chunk| chunk.file_path.as_str())
            .collect();

        tracing::debug!(
            "files_matching type={:?} text={:?} -> {} files",
            filter.chunk_type,
            filter.text,
            files.len()
        );
        files.into_iter().map(str::to_string).collect()
    }

    /// Every chunk of one file in extraction order
    ///
    /// `file_path` may be relative to the project root or absolute under it;
    /// an unknown path, or an absolute one outside the root, yields an empty
    /// list.
    pub fn chunk_names_in_file(&self, file_path: &str) -> Vec<ChunkSummary> {
        let Some(normalized) = normalize_file_path(&self.root, file_path) else {
            return Vec::new();
        };
        self.snapshot
            .chunks_in_file(&normalized)
            .iter()
            .map(|chunk| ChunkSummary {
                id: chunk.id.clone(),
                name: chunk.name.clone(),
                chunk_type: chunk.chunk_type,
                line_span: chunk.line_span,
            })
            .collect()
    }

    /// Indexed files, optionally narrowed to paths containing any of the
    /// case-insensitive substrings
    pub fn list_files(&self, path_filter: &[String]) -> Vec<FileSummary> {
        let needles: Vec<String> = path_filter
            .iter()
            .filter(|n| !n.is_empty())
            .map(|n| n.to_lowercase())
            .collect();

        self.snapshot
            .files()
            .filter(|(path, _)| {
                if needles.is_empty() {
                    return true;
                }
                let lowered = path.to_lowercase();
                needles.iter().any(|n| lowered.contains(n.as_str()))
            })
            .map(|(path, entry)| FileSummary {
                file_path: path.to_string(),
                language: entry.language.clone(),
                chunk_count: entry.range.len(),
            })
            .collect()
    }

    /// Compact text listing of the indexed files
    ///
    /// One path per line, or one `dir: a; b` line per directory when that is
    /// shorter. Files at the root are grouped under `.`.
    pub fn file_tree(&self, path_filter: &[String]) -> String {
        let files = self.list_files(path_filter);
        let flat: String = files.iter().map(|f| format!("{}\n", f.file_path)).collect();

        let mut by_dir: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for file in &files {
            let (dir, name) = file
                .file_path
                .rsplit_once('/')
                .unwrap_or((".", file.file_path.as_str()));
            by_dir.entry(dir).or_default().push(name);
        }
        let grouped: String = by_dir
            .iter()
            .map(|(dir, names)| format!("{}: {}\n", dir, names.join("; ")))
            .collect();

        if grouped.len() < flat.len() {
            grouped
        } else {
            flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{ExtractorSet, SourceFile};
    use crate::store::ChunkStore;

    fn engine() -> QueryEngine {
        let store = ChunkStore::new(Arc::new(ExtractorSet::default()));
        store.rebuild(vec![
            SourceFile::new(
                "src/auth.py",
                "import hashlib\n\ndef login(user):\n    return check_password(user)\n\ndef logout(user):\n    pass\n",
            ),
            SourceFile::new(
                "src/util.rs",
                "fn parse_config() -> u32 {\n    1\n}\n",
            ),
            SourceFile::new("docs/guide.md", "# Login flow\nUse the form.\n# FAQ\nNone.\n"),
            SourceFile::new("notes.txt", "remember the password rotation\n"),
        ]);
        QueryEngine::new("/work/project", store.snapshot())
    }

    #[test]
    fn test_empty_filter_matches_every_file() {
        let files = engine().files_matching(&ChunkFilter::new());
        assert_eq!(
            files,
            vec!["docs/guide.md", "notes.txt", "src/auth.py", "src/util.rs"]
        );
    }

    #[test]
    fn test_filter_by_type() {
        let engine = engine();
        let callables = engine.files_matching(&ChunkFilter::new().with_chunk_type(ChunkType::Callable));
        assert_eq!(callables, vec!["src/auth.py", "src/util.rs"]);

        let sections = engine.files_matching(&ChunkFilter::new().with_chunk_type(ChunkType::Section));
        assert_eq!(sections, vec!["docs/guide.md"]);

        let hunks = engine.files_matching(&ChunkFilter::new().with_chunk_type(ChunkType::DiffHunk));
        assert!(hunks.is_empty());
    }

    #[test]
    fn test_text_filter_is_case_insensitive() {
        let files = engine().files_matching(&ChunkFilter::new().with_text("LOGIN"));
        assert_eq!(files, vec!["docs/guide.md", "src/auth.py"]);
    }

    #[test]
    fn test_type_and_text_combined() {
        let filter = ChunkFilter::new()
            .with_chunk_type(ChunkType::Callable)
            .with_text("password");
        assert_eq!(engine().files_matching(&filter), vec!["src/auth.py"]);
    }

    #[test]
    fn test_text_filter_targets() {
        let engine = engine();
        let by_name = ChunkFilter::new()
            .with_text("password")
            .with_target(FilterTarget::Name);
        assert!(engine.files_matching(&by_name).is_empty());

        let by_content = ChunkFilter::new()
            .with_text("password")
            .with_target(FilterTarget::Content);
        assert_eq!(
            engine.files_matching(&by_content),
            vec!["notes.txt", "src/auth.py"]
        );
    }

    #[test]
    fn test_any_needle_matches() {
        let filter = ChunkFilter::new().with_text("parse_config").with_text("faq");
        assert_eq!(
            engine().files_matching(&filter),
            vec!["docs/guide.md", "src/util.rs"]
        );
    }

    #[test]
    fn test_chunk_names_in_file() {
        let engine = engine();
        let names: Vec<(String, ChunkType)> = engine
            .chunk_names_in_file("src/auth.py")
            .into_iter()
            .map(|s| (s.name, s.chunk_type))
            .collect();
        assert_eq!(
            names,
            vec![
                ("<imports>".to_string(), ChunkType::Imports),
                ("<module_level_statements>".to_string(), ChunkType::ModuleLevel),
                ("login".to_string(), ChunkType::Callable),
                ("logout".to_string(), ChunkType::Callable),
            ]
        );
    }

    #[test]
    fn test_chunk_names_accepts_absolute_and_unknown_paths() {
        let engine = engine();
        let relative = engine.chunk_names_in_file("docs/guide.md");
        let absolute = engine.chunk_names_in_file("/work/project/docs/guide.md");
        assert_eq!(relative, absolute);
        assert_eq!(relative.len(), 2);
        assert_eq!(relative[0].line_span, LineSpan::new(1, 2));

        assert!(engine.chunk_names_in_file("missing.rs").is_empty());
    }

    #[test]
    fn test_absolute_path_outside_root_matches_nothing() {
        let store = ChunkStore::new(Arc::new(ExtractorSet::default()));
        store.rebuild(vec![SourceFile::new("etc/notes.md", "# Notes
Text.
")]);
        let engine = QueryEngine::new("/work/project", store.snapshot());

        assert_eq!(engine.chunk_names_in_file("etc/notes.md").len(), 1);
        assert!(engine.chunk_names_in_file("/etc/notes.md").is_empty());
    }

    #[test]
    fn test_list_files() {
        let engine = engine();
        let all = engine.list_files(&[]);
        assert_eq!(all.len(), 4);
        assert_eq!(all[2].file_path, "src/auth.py");
        assert_eq!(all[2].language, Some("Python".to_string()));
        assert_eq!(all[2].chunk_count, 4);

        let filtered = engine.list_files(&["SRC/".to_string()]);
        let paths: Vec<_> = filtered.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(paths, vec!["src/auth.py", "src/util.rs"]);
    }

    #[test]
    fn test_file_tree_picks_shorter_rendering() {
        let engine = engine();
        assert_eq!(
            engine.file_tree(&[]),
            "docs/guide.md\nnotes.txt\nsrc/auth.py\nsrc/util.rs\n"
        );
        assert_eq!(engine.file_tree(&["nothing".to_string()]), "");

        let store = ChunkStore::new(Arc::new(ExtractorSet::default()));
        store.rebuild(vec![
            SourceFile::new("a/deep/dir/one.txt", "1\n"),
            SourceFile::new("a/deep/dir/two.txt", "2\n"),
            SourceFile::new("a/deep/dir/three.txt", "3\n"),
            SourceFile::new("top.txt", "t\n"),
        ]);
        let deep = QueryEngine::new("/work/project", store.snapshot());
        assert_eq!(
            deep.file_tree(&[]),
            ".: top.txt\na/deep/dir: one.txt; three.txt; two.txt\n"
        );
    }
}

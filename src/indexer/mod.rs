//! File walking, language detection and chunk extraction
//!
//! Every file of a project is turned into a list of addressable chunks by the
//! first capable [`ChunkExtractor`] in an [`ExtractorSet`]. Specialized
//! extractors understand one file kind (Python, other tree-sitter languages,
//! Markdown, Vue, unified diffs); the whole-file extractor accepts anything.

mod ast_parser;
mod diff;
mod extractor;
mod file_walker;
mod language;
mod markdown;
mod python;
mod vue;
mod whole_file;

pub use ast_parser::AstParser;
pub use diff::DiffExtractor;
pub use extractor::{ExtractorSet, FileExtraction, SPLIT_CHUNK_NOTICE};
pub use file_walker::{FileWalker, SourceFile};
pub use language::detect_language;
pub use markdown::MarkdownExtractor;
pub use python::PythonExtractor;
pub use vue::VueExtractor;
pub use whole_file::WholeFileExtractor;

use crate::error::ExtractionError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Kind of a chunk, independent of the extractor that produced it
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// A function, method, class or other named code unit
    Callable,
    /// A markdown section
    Section,
    /// The import statements of a module
    Imports,
    /// Module-level statements outside any callable
    ModuleLevel,
    /// One hunk of a unified diff
    DiffHunk,
    /// A line-bounded segment of a file no specialized extractor handled
    WholeFile,
    Other,
}

impl ChunkType {
    pub const ALL: [ChunkType; 7] = [
        ChunkType::Callable,
        ChunkType::Section,
        ChunkType::Imports,
        ChunkType::ModuleLevel,
        ChunkType::DiffHunk,
        ChunkType::WholeFile,
        ChunkType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Callable => "callable",
            ChunkType::Section => "section",
            ChunkType::Imports => "imports",
            ChunkType::ModuleLevel => "module_level",
            ChunkType::DiffHunk => "diff_hunk",
            ChunkType::WholeFile => "whole_file",
            ChunkType::Other => "other",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            // "markdown section" is the older name for sections
            "markdown_section" => Ok(ChunkType::Section),
            other => ChunkType::ALL
                .into_iter()
                .find(|t| t.as_str() == other)
                .ok_or_else(|| {
                    format!(
                        "unknown chunk type '{}', expected one of: {}",
                        s,
                        ChunkType::ALL.map(|t| t.as_str()).join(", ")
                    )
                }),
        }
    }
}

/// 1-based inclusive line range of a chunk within its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// A chunk as produced by an extractor, before it has an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    pub chunk_type: ChunkType,
    pub name: String,
    pub content: String,
    pub line_span: LineSpan,
}

impl ChunkDraft {
    pub fn new(
        chunk_type: ChunkType,
        name: impl Into<String>,
        content: impl Into<String>,
        line_span: LineSpan,
    ) -> Self {
        Self {
            chunk_type,
            name: name.into(),
            content: content.into(),
            line_span,
        }
    }
}

/// An addressable, immutable piece of a project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Chunk {
    /// Stable identifier, unique within the owning store
    pub id: String,
    /// Path relative to the project root, `/`-separated
    pub file_path: String,
    pub chunk_type: ChunkType,
    pub name: String,
    pub content: String,
    pub line_span: LineSpan,
}

/// Turns the text of one file kind into chunk drafts
///
/// Implementations must be deterministic: the same path and content always
/// yield the same drafts in the same order.
pub trait ChunkExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Cheap check, usually on the extension only. The file need not exist.
    fn can_handle(&self, path: &Path) -> bool;

    fn extract(&self, path: &str, content: &str) -> Result<Vec<ChunkDraft>, ExtractionError>;
}

/// Lowercased extension of a path, if any
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChunkType::ModuleLevel).unwrap(),
            "\"module_level\""
        );
        assert_eq!(
            serde_json::from_str::<ChunkType>("\"diff_hunk\"").unwrap(),
            ChunkType::DiffHunk
        );
        for chunk_type in ChunkType::ALL {
            assert_eq!(chunk_type.to_string().parse::<ChunkType>(), Ok(chunk_type));
        }
    }

    #[test]
    fn test_chunk_type_lenient_parse() {
        assert_eq!("Whole-File".parse::<ChunkType>(), Ok(ChunkType::WholeFile));
        assert_eq!("markdown section".parse::<ChunkType>(), Ok(ChunkType::Section));
        let err = "function".parse::<ChunkType>().unwrap_err();
        assert!(err.contains("expected one of: callable, section"));
    }

    #[test]
    fn test_line_span_clamps_end() {
        let span = LineSpan::new(5, 3);
        assert_eq!(span, LineSpan { start: 5, end: 5 });
        assert_eq!(LineSpan::new(2, 4).line_count(), 3);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/B.PY")), Some("py".to_string()));
        assert_eq!(extension_of(Path::new("Makefile")), None);
    }
}

//! Ordered extractor registry with id assignment, splitting and fallback

use super::whole_file::pack_lines;
use super::{
    AstParser, Chunk, ChunkDraft, ChunkExtractor, ChunkType, DiffExtractor, LineSpan,
    MarkdownExtractor, PythonExtractor, VueExtractor, WholeFileExtractor,
};
use crate::config::IndexingConfig;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

/// Prefix of every part produced when an oversized chunk is split
pub const SPLIT_CHUNK_NOTICE: &str =
    "[This is a subsection of the chunk. Other parts contain the rest of the chunk]\n\n";

/// Longest sanitized name kept in a chunk id
const MAX_ID_NAME_LEN: usize = 48;

/// Chunks of one file plus how they were obtained
#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    pub chunks: Vec<Chunk>,
    /// Name of the extractor whose output was used
    pub extractor: &'static str,
    /// True when a specialized extractor failed and the whole-file
    /// extractor (or nothing, if disabled) stood in for it
    pub fell_back: bool,
}

/// Extractors tried in registration order; the first capable one wins
pub struct ExtractorSet {
    extractors: Vec<Box<dyn ChunkExtractor>>,
    whole_file: WholeFileExtractor,
    max_chunk_size: usize,
    whole_file_fallback: bool,
}

impl ExtractorSet {
    /// Standard registration order: Python, other tree-sitter languages,
    /// Markdown, Vue, unified diffs, then the whole-file catch-all
    pub fn new(max_chunk_size: usize, whole_file_fallback: bool) -> Self {
        let mut extractors: Vec<Box<dyn ChunkExtractor>> = vec![
            Box::new(PythonExtractor),
            Box::new(AstParser),
            Box::new(MarkdownExtractor),
            Box::new(VueExtractor),
            Box::new(DiffExtractor),
        ];
        if whole_file_fallback {
            extractors.push(Box::new(WholeFileExtractor::new(max_chunk_size)));
        }

        Self {
            extractors,
            whole_file: WholeFileExtractor::new(max_chunk_size),
            max_chunk_size,
            whole_file_fallback,
        }
    }

    pub fn from_config(config: &IndexingConfig) -> Self {
        Self::new(config.max_chunk_size, config.whole_file_fallback)
    }

    /// Names of the registered extractors, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// First extractor that accepts the path
    pub fn extractor_for(&self, path: &Path) -> Option<&dyn ChunkExtractor> {
        self.extractors
            .iter()
            .find(|e| e.can_handle(path))
            .map(|e| e.as_ref())
    }

    pub fn has_capable_extractor(&self, path: &Path) -> bool {
        self.extractor_for(path).is_some()
    }

    /// Extract, split and identify the chunks of one file
    ///
    /// Never fails: a specialized extractor that errors, or that returns
    /// nothing for non-blank content, is replaced by the whole-file
    /// extractor for this file.
    pub fn extract_file(&self, file_path: &str, content: &str) -> FileExtraction {
        let Some(extractor) = self.extractor_for(Path::new(file_path)) else {
            return FileExtraction {
                extractor: "none",
                ..Default::default()
            };
        };

        let (drafts, extractor_name, fell_back) = match extractor.extract(file_path, content) {
            Ok(drafts) if !drafts.is_empty() || content.trim().is_empty() => {
                (drafts, extractor.name(), false)
            }
            Ok(_) => {
                tracing::warn!(
                    "ExtractionFallback: {} produced no chunks for {}",
                    extractor.name(),
                    file_path
                );
                self.fallback(file_path, content)
            }
            Err(e) => {
                tracing::warn!(
                    "ExtractionFallback: {} failed for {}: {}",
                    extractor.name(),
                    file_path,
                    e
                );
                self.fallback(file_path, content)
            }
        };

        let drafts = drafts
            .into_iter()
            .flat_map(|draft| split_draft(draft, self.max_chunk_size))
            .collect::<Vec<_>>();

        FileExtraction {
            chunks: assign_ids(file_path, drafts),
            extractor: extractor_name,
            fell_back,
        }
    }

    fn fallback(&self, file_path: &str, content: &str) -> (Vec<ChunkDraft>, &'static str, bool) {
        if !self.whole_file_fallback {
            return (Vec::new(), "none", true);
        }
        match self.whole_file.extract(file_path, content) {
            Ok(drafts) => (drafts, self.whole_file.name(), true),
            Err(e) => {
                tracing::warn!("whole-file extraction failed for {}: {}", file_path, e);
                (Vec::new(), "none", true)
            }
        }
    }
}

impl Default for ExtractorSet {
    fn default() -> Self {
        Self::from_config(&IndexingConfig::default())
    }
}

/// Split a draft longer than `max_size` characters into `<name>_partN` drafts
///
/// Whole-file chunks are already bounded and pass through untouched.
pub(crate) fn split_draft(draft: ChunkDraft, max_size: usize) -> Vec<ChunkDraft> {
    if draft.chunk_type == ChunkType::WholeFile || draft.content.chars().count() <= max_size {
        return vec![draft];
    }

    let budget = max_size.saturating_sub(SPLIT_CHUNK_NOTICE.chars().count());
    let offset = draft.line_span.start - 1;

    pack_lines(&draft.content, budget)
        .into_iter()
        .enumerate()
        .map(|(i, segment)| {
            ChunkDraft::new(
                draft.chunk_type,
                format!("{}_part{}", draft.name, i + 1),
                format!("{}{}", SPLIT_CHUNK_NOTICE, segment.content),
                LineSpan::new(segment.start_line + offset, segment.end_line + offset),
            )
        })
        .collect()
}

/// Give every draft of a file its stable id
///
/// The ordinal counts earlier drafts in the same file with the same type and
/// name, so repeated names (overloads, duplicate headings) stay distinct.
pub(crate) fn assign_ids(file_path: &str, drafts: Vec<ChunkDraft>) -> Vec<Chunk> {
    let mut seen: HashMap<(ChunkType, String), usize> = HashMap::new();

    drafts
        .into_iter()
        .map(|draft| {
            let ordinal = seen
                .entry((draft.chunk_type, draft.name.clone()))
                .and_modify(|n| *n += 1)
                .or_insert(0);
            Chunk {
                id: chunk_id(file_path, draft.chunk_type, &draft.name, *ordinal),
                file_path: file_path.to_string(),
                chunk_type: draft.chunk_type,
                name: draft.name,
                content: draft.content,
                line_span: draft.line_span,
            }
        })
        .collect()
}

/// `<sanitized name>_<first 10 hex of sha256(path, type, name, ordinal)>`
pub fn chunk_id(file_path: &str, chunk_type: ChunkType, name: &str, ordinal: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update([0]);
    hasher.update(chunk_type.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(name.as_bytes());
    hasher.update([0]);
    hasher.update(ordinal.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{}_{}", sanitize_name(name), &digest[..10])
}

fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_ID_NAME_LEN)
        .collect();
    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        "chunk".to_string()
    } else {
        trimmed.to_string()
    }
}

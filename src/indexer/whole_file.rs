//! Catch-all extractor that cuts a file into line-bounded segments

use super::{ChunkDraft, ChunkExtractor, ChunkType, LineSpan};
use crate::error::ExtractionError;
use std::path::Path;

/// Margin kept below the segment size when hard-splitting one long line
const LONG_LINE_MARGIN: usize = 50;

/// A run of consecutive lines packed under a size limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

/// Pack `content` into segments of at most `max_size` characters
///
/// Lines keep their terminators and are never split unless a single line is
/// longer than `max_size - 50` characters, in which case it is hard-split into
/// pieces that all report the same line number.
pub(crate) fn pack_lines(content: &str, max_size: usize) -> Vec<Segment> {
    let max_line = max_size.saturating_sub(LONG_LINE_MARGIN).max(1);

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_size = 0usize;
    let mut start_line = 1usize;
    let mut last_line = 1usize;

    for (index, line) in content.split_inclusive('\n').enumerate() {
        let line_no = index + 1;
        for piece in split_long_line(line, max_line) {
            let piece_size = piece.chars().count();
            if current_size + piece_size > max_size && !current.is_empty() {
                segments.push(Segment {
                    start_line,
                    end_line: last_line,
                    content: std::mem::take(&mut current),
                });
                current_size = 0;
            }
            if current.is_empty() {
                start_line = line_no;
            }
            current.push_str(piece);
            current_size += piece_size;
            last_line = line_no;
        }
    }

    if !current.is_empty() {
        segments.push(Segment {
            start_line,
            end_line: last_line,
            content: current,
        });
    }

    segments
}

/// Split a line into pieces of at most `max_chars` characters
fn split_long_line(line: &str, max_chars: usize) -> Vec<&str> {
    if line.chars().count() <= max_chars {
        return vec![line];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in line.char_indices() {
        if count == max_chars {
            pieces.push(&line[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    pieces.push(&line[start..]);
    pieces
}

/// Handles every file: consecutive segments of at most `max_chunk_size`
/// characters named `<file_chunk_N>` after their first line
pub struct WholeFileExtractor {
    max_chunk_size: usize,
}

impl WholeFileExtractor {
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }
}

impl Default for WholeFileExtractor {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl ChunkExtractor for WholeFileExtractor {
    fn name(&self) -> &'static str {
        "whole_file"
    }

    fn can_handle(&self, _path: &Path) -> bool {
        true
    }

    fn extract(&self, _path: &str, content: &str) -> Result<Vec<ChunkDraft>, ExtractionError> {
        Ok(pack_lines(content, self.max_chunk_size)
            .into_iter()
            .map(|segment| {
                ChunkDraft::new(
                    ChunkType::WholeFile,
                    format!("<file_chunk_{}>", segment.start_line),
                    segment.content,
                    LineSpan::new(segment.start_line, segment.end_line),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_file_is_one_chunk() {
        let extractor = WholeFileExtractor::default();
        let drafts = extractor.extract("notes.txt", "alpha\nbeta\ngamma\n").unwrap();

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "<file_chunk_1>");
        assert_eq!(drafts[0].chunk_type, ChunkType::WholeFile);
        assert_eq!(drafts[0].content, "alpha\nbeta\ngamma\n");
        assert_eq!(drafts[0].line_span, LineSpan::new(1, 3));
    }

    #[test]
    fn test_empty_file_has_no_chunks() {
        let extractor = WholeFileExtractor::default();
        assert!(extractor.extract("empty.txt", "").unwrap().is_empty());
    }

    #[test]
    fn test_splits_at_line_boundaries() {
        // 300 lines of 100 chars (incl. newline) = 30_000 chars
        let line = format!("{}\n", "x".repeat(99));
        let content = line.repeat(300);

        let extractor = WholeFileExtractor::new(10_000);
        let drafts = extractor.extract("big.txt", &content).unwrap();

        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].name, "<file_chunk_1>");
        assert_eq!(drafts[1].name, "<file_chunk_101>");
        assert_eq!(drafts[2].name, "<file_chunk_201>");
        assert_eq!(drafts[1].line_span, LineSpan::new(101, 200));
        for draft in &drafts {
            assert!(draft.content.chars().count() <= 10_000);
            assert!(draft.content.ends_with('\n'));
        }
        let joined: String = drafts.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(joined, content);
    }

    #[test]
    fn test_hard_splits_long_lines() {
        let content = format!("short\n{}\nend", "y".repeat(25_000));

        let extractor = WholeFileExtractor::new(10_000);
        let drafts = extractor.extract("minified.js", &content).unwrap();

        assert!(drafts.len() >= 3);
        for draft in &drafts {
            assert!(draft.content.chars().count() <= 10_000);
        }
        let joined: String = drafts.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(joined, content);
        // The pieces of the long line all report line 2
        assert_eq!(drafts[1].line_span.start, 2);
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let content = "é".repeat(300);
        let segments = pack_lines(&content, 200);
        assert!(segments.iter().all(|s| s.content.chars().count() <= 200));
        let joined: String = segments.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(joined, content);
    }

    #[test]
    fn test_deterministic() {
        let content = "a\n".repeat(7_000);
        let extractor = WholeFileExtractor::new(1_000);
        assert_eq!(
            extractor.extract("a.txt", &content).unwrap(),
            extractor.extract("a.txt", &content).unwrap()
        );
    }
}

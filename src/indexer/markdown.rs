//! Markdown extractor: one section per ATX heading

use super::{ChunkDraft, ChunkExtractor, ChunkType, LineSpan, extension_of};
use crate::error::ExtractionError;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}(\s|$)").expect("valid regex"));

const NO_HEADING: &str = "(no heading)";

pub struct MarkdownExtractor;

/// Tracks whether we are inside a ``` or ~~~ fenced block
#[derive(Default)]
struct FenceState {
    open: Option<(char, usize)>,
}

impl FenceState {
    /// Feed one line; returns true when the line is part of a fence
    /// (including its opening and closing markers)
    fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~');
        let run = marker.map(|m| trimmed.chars().take_while(|c| *c == m).count());

        match (self.open, marker, run) {
            (None, Some(m), Some(n)) if n >= 3 => {
                self.open = Some((m, n));
                true
            }
            (Some((m, n)), Some(c), Some(len))
                if c == m && len >= n && trimmed[len..].trim().is_empty() =>
            {
                self.open = None;
                true
            }
            (Some(_), _, _) => true,
            _ => false,
        }
    }
}

impl ChunkExtractor for MarkdownExtractor {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn can_handle(&self, path: &Path) -> bool {
        matches!(extension_of(path).as_deref(), Some("md" | "markdown"))
    }

    fn extract(&self, _path: &str, content: &str) -> Result<Vec<ChunkDraft>, ExtractionError> {
        let mut lines: Vec<&str> = content.split('\n').collect();
        // A trailing newline does not start another line
        if content.ends_with('\n') {
            lines.pop();
        }

        let mut drafts = Vec::new();
        let mut fence = FenceState::default();
        let mut heading: Option<&str> = None;
        let mut section_start = 0usize;

        for (index, line) in lines.iter().enumerate() {
            let in_fence = fence.update(line);
            if in_fence || !HEADING.is_match(line) {
                continue;
            }
            push_section(&mut drafts, heading, &lines[section_start..index], section_start);
            heading = Some(*line);
            section_start = index;
        }
        push_section(&mut drafts, heading, &lines[section_start..], section_start);

        Ok(drafts)
    }
}

fn push_section(drafts: &mut Vec<ChunkDraft>, heading: Option<&str>, lines: &[&str], start: usize) {
    if lines.is_empty() {
        return;
    }
    let content = lines.join("\n");
    let name = match heading {
        Some(heading) => heading_name(heading),
        // Preamble before the first heading is kept only if it says something
        None if content.trim().is_empty() => return,
        None => NO_HEADING.to_string(),
    };
    drafts.push(ChunkDraft::new(
        ChunkType::Section,
        name,
        content,
        LineSpan::new(start + 1, start + lines.len()),
    ));
}

fn heading_name(heading: &str) -> String {
    let name = heading.replace('#', "");
    let name = name.trim();
    if name.is_empty() {
        "(empty heading)".to_string()
    } else {
        name.to_string()
    }
}

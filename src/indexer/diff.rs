//! Unified diff extractor: one chunk per hunk

use super::{ChunkDraft, ChunkExtractor, ChunkType, LineSpan, extension_of};
use crate::error::ExtractionError;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid regex")
});

pub struct DiffExtractor;

impl ChunkExtractor for DiffExtractor {
    fn name(&self) -> &'static str {
        "diff"
    }

    fn can_handle(&self, path: &Path) -> bool {
        matches!(extension_of(path).as_deref(), Some("diff" | "patch"))
    }

    fn extract(&self, path: &str, content: &str) -> Result<Vec<ChunkDraft>, ExtractionError> {
        let lines: Vec<&str> = content.lines().collect();
        let mut drafts = Vec::new();
        let mut old_path: Option<String> = None;
        let mut new_path: Option<String> = None;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if line.starts_with("diff ") {
                old_path = None;
                new_path = None;
            } else if let Some(rest) = line.strip_prefix("--- ") {
                old_path = Some(strip_diff_prefix(rest));
            } else if let Some(rest) = line.strip_prefix("+++ ") {
                new_path = Some(strip_diff_prefix(rest));
            } else if line.starts_with("@@") {
                let caps = HUNK_HEADER.captures(line).ok_or_else(|| ExtractionError::ParseFailed {
                    path: path.to_string(),
                    reason: format!("malformed hunk header at line {}: {}", i + 1, line),
                })?;
                let count = |idx: usize| {
                    caps.get(idx)
                        .map_or(Ok(1), |m| m.as_str().parse::<usize>())
                        .unwrap_or(0)
                };
                let mut old_remaining = count(2);
                let mut new_remaining = count(4);
                let header = caps.get(0).map_or(line, |m| m.as_str());

                let start = i;
                i += 1;
                while i < lines.len() && (old_remaining > 0 || new_remaining > 0) {
                    match lines[i].chars().next() {
                        Some('-') => old_remaining = old_remaining.saturating_sub(1),
                        Some('+') => new_remaining = new_remaining.saturating_sub(1),
                        Some('\\') => {}
                        // Context lines, including blank ones some tools strip the space from
                        _ => {
                            old_remaining = old_remaining.saturating_sub(1);
                            new_remaining = new_remaining.saturating_sub(1);
                        }
                    }
                    i += 1;
                }
                // "\ No newline at end of file" after the last line of the hunk
                while i < lines.len() && lines[i].starts_with('\\') {
                    i += 1;
                }

                let target = target_path(new_path.as_deref(), old_path.as_deref());
                drafts.push(ChunkDraft::new(
                    ChunkType::DiffHunk,
                    format!("{} {}", target, header),
                    lines[start..i].join("\n"),
                    LineSpan::new(start + 1, i),
                ));
                continue;
            }
            i += 1;
        }

        if drafts.is_empty() {
            return Err(ExtractionError::NoHunks(path.to_string()));
        }
        Ok(drafts)
    }
}

/// `a/src/lib.rs` -> `src/lib.rs`, dropping any trailing timestamp
fn strip_diff_prefix(raw: &str) -> String {
    let path = raw.split('\t').next().unwrap_or(raw).trim();
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
        .to_string()
}

fn target_path<'a>(new_path: Option<&'a str>, old_path: Option<&'a str>) -> &'a str {
    match (new_path, old_path) {
        (Some(new), _) if new != "/dev/null" => new,
        (_, Some(old)) => old,
        _ => "(unknown)",
    }
}

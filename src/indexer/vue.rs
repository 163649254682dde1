//! Vue single-file component extractor
//!
//! Each top-level block (`<template>`, `<script>`, `<style>` and custom
//! blocks) becomes its own chunk named after the tag. Text outside any block
//! is gathered into one `outer_content` chunk.

use super::{ChunkDraft, ChunkExtractor, ChunkType, LineSpan, extension_of};
use crate::error::ExtractionError;
use std::path::Path;

/// Blocks whose body is raw text, so nested tags are not tracked
const RAW_TEXT_BLOCKS: &[&str] = &["script", "style"];

pub struct VueExtractor;

impl ChunkExtractor for VueExtractor {
    fn name(&self) -> &'static str {
        "vue"
    }

    fn can_handle(&self, path: &Path) -> bool {
        extension_of(path).as_deref() == Some("vue")
    }

    fn extract(&self, path: &str, content: &str) -> Result<Vec<ChunkDraft>, ExtractionError> {
        let fail = |reason: String| ExtractionError::ParseFailed {
            path: path.to_string(),
            reason,
        };

        let mut drafts = Vec::new();
        let mut outer: Vec<(usize, usize)> = Vec::new();
        let mut text_start = 0;
        let mut pos = 0;

        while let Some(rel) = content[pos..].find('<') {
            let lt = pos + rel;

            if content[lt..].starts_with("<!--") {
                let end = content[lt..].find("-->").ok_or_else(|| {
                    fail(format!("unclosed comment at line {}", line_at(content, lt)))
                })?;
                outer.push((text_start, lt));
                pos = lt + end + 3;
                text_start = pos;
                continue;
            }

            let name: String = content[lt + 1..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect();
            if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
                // Not a tag, keep it as outer text
                pos = lt + 1;
                continue;
            }
            outer.push((text_start, lt));

            let open_end = tag_end(content, lt).ok_or_else(|| {
                fail(format!("unterminated <{}> at line {}", name, line_at(content, lt)))
            })?;

            let block_end = if content[..open_end].ends_with("/>") {
                open_end
            } else {
                closing_tag_end(content, &name, open_end).ok_or_else(|| {
                    fail(format!("unclosed <{}> at line {}", name, line_at(content, lt)))
                })?
            };

            drafts.push(ChunkDraft::new(
                ChunkType::Other,
                name,
                &content[lt..block_end],
                LineSpan::new(line_at(content, lt), line_at(content, block_end - 1)),
            ));
            pos = block_end;
            text_start = pos;
        }
        outer.push((text_start, content.len()));

        if let Some(draft) = outer_content(content, &outer) {
            drafts.push(draft);
        }
        Ok(drafts)
    }
}

/// Byte offset just past the `>` closing the tag that starts at `lt`
fn tag_end(content: &str, lt: usize) -> Option<usize> {
    content[lt..].find('>').map(|i| lt + i + 1)
}

/// Byte offset just past the `</name>` matching an already opened block
fn closing_tag_end(content: &str, name: &str, from: usize) -> Option<usize> {
    let open_needle = format!("<{}", name);
    let close_needle = format!("</{}", name);
    let raw = RAW_TEXT_BLOCKS.contains(&name);

    let mut depth = 1usize;
    let mut cursor = from;
    loop {
        let next_close = find_tag(content, cursor, &close_needle)?;
        let next_open = if raw {
            None
        } else {
            find_tag(content, cursor, &open_needle)
        };

        match next_open {
            Some(open) if open < next_close => {
                let end = tag_end(content, open)?;
                if !content[..end].ends_with("/>") {
                    depth += 1;
                }
                cursor = end;
            }
            _ => {
                let end = tag_end(content, next_close)?;
                depth -= 1;
                if depth == 0 {
                    return Some(end);
                }
                cursor = end;
            }
        }
    }
}

/// Next `needle` (such as `<template` or `</template`) that is followed by
/// whitespace, `>` or `/`
fn find_tag(content: &str, from: usize, needle: &str) -> Option<usize> {
    let mut start = from;
    while let Some(rel) = content[start..].find(needle) {
        let at = start + rel;
        let after = content[at + needle.len()..].chars().next();
        if matches!(after, Some('>' | '/')) || after.is_some_and(char::is_whitespace) {
            return Some(at);
        }
        start = at + needle.len();
    }
    None
}

fn outer_content(content: &str, ranges: &[(usize, usize)]) -> Option<ChunkDraft> {
    let mut pieces = Vec::new();
    let mut first_line = None;
    let mut last_line = 0;

    for &(start, end) in ranges {
        let text = &content[start..end];
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lead = text.len() - text.trim_start().len();
        let trimmed_start = start + lead;
        first_line.get_or_insert(line_at(content, trimmed_start));
        last_line = line_at(content, trimmed_start + trimmed.len() - 1);
        pieces.push(trimmed);
    }

    let first_line = first_line?;
    Some(ChunkDraft::new(
        ChunkType::ModuleLevel,
        "outer_content",
        pieces.join("\n"),
        LineSpan::new(first_line, last_line),
    ))
}

fn line_at(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENT: &str = r#"<template>
  <div>{{ msg }}</div>
  <template v-if="ok"><span /></template>
</template>

<script setup lang="ts">
const msg = "<template>"
</script>

<style scoped>
.a { color: red; }
</style>
stray text
"#;

    #[test]
    fn test_can_handle() {
        assert!(VueExtractor.can_handle(Path::new("src/App.vue")));
        assert!(!VueExtractor.can_handle(Path::new("src/App.js")));
    }

    #[test]
    fn test_top_level_blocks() {
        let drafts = VueExtractor.extract("App.vue", COMPONENT).unwrap();
        let names: Vec<_> = drafts.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["template", "script", "style", "outer_content"]);

        assert_eq!(drafts[0].chunk_type, ChunkType::Other);
        assert!(drafts[0].content.starts_with("<template>\n"));
        assert!(drafts[0].content.ends_with("</template>"));
        assert!(drafts[0].content.contains("<span /></template>"));
        assert_eq!(drafts[0].line_span, LineSpan::new(1, 4));

        assert_eq!(
            drafts[1].content,
            "<script setup lang=\"ts\">\nconst msg = \"<template>\"\n</script>"
        );
        assert_eq!(drafts[1].line_span, LineSpan::new(6, 8));
        assert_eq!(drafts[2].line_span, LineSpan::new(10, 12));
    }

    #[test]
    fn test_outer_content() {
        let drafts = VueExtractor.extract("App.vue", COMPONENT).unwrap();
        let outer = drafts.last().unwrap();
        assert_eq!(outer.chunk_type, ChunkType::ModuleLevel);
        assert_eq!(outer.content, "stray text");
        assert_eq!(outer.line_span, LineSpan::new(13, 13));
    }

    #[test]
    fn test_comments_and_custom_blocks() {
        let source = "<!-- header -->\n<i18n lang=\"json\">{\"en\": {}}</i18n>\n<docs/>\n";
        let drafts = VueExtractor.extract("C.vue", source).unwrap();
        let names: Vec<_> = drafts.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["i18n", "docs"]);
        assert_eq!(drafts[1].content, "<docs/>");
    }

    #[test]
    fn test_unclosed_block_fails() {
        let err = VueExtractor
            .extract("Broken.vue", "<template>\n<div></div>\n")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::ParseFailed { .. }));
    }
}

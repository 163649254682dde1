//! Python extractor: imports, module-level statements and every callable

use super::{ChunkDraft, ChunkExtractor, ChunkType, LineSpan, extension_of};
use crate::error::ExtractionError;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

const IMPORT_KINDS: &[&str] = &[
    "import_statement",
    "import_from_statement",
    "future_import_statement",
];

pub struct PythonExtractor;

impl PythonExtractor {
    fn parse(path: &str, content: &str) -> Result<Tree, ExtractionError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ExtractionError::ParseFailed {
                path: path.to_string(),
                reason: format!("failed to load Python grammar: {}", e),
            })?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ExtractionError::ParseFailed {
                path: path.to_string(),
                reason: "parser returned no tree".to_string(),
            })?;

        if let Some(reason) = first_syntax_error(tree.root_node()) {
            return Err(ExtractionError::ParseFailed {
                path: path.to_string(),
                reason,
            });
        }
        Ok(tree)
    }
}

impl ChunkExtractor for PythonExtractor {
    fn name(&self) -> &'static str {
        "python"
    }

    fn can_handle(&self, path: &Path) -> bool {
        matches!(extension_of(path).as_deref(), Some("py" | "pyi"))
    }

    fn extract(&self, path: &str, content: &str) -> Result<Vec<ChunkDraft>, ExtractionError> {
        let tree = Self::parse(path, content)?;
        let root = tree.root_node();
        let src = content.as_bytes();

        let mut imports = Vec::new();
        let mut statements = Vec::new();

        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            if node.kind() == "comment" {
                continue;
            }
            if IMPORT_KINDS.contains(&node.kind()) {
                imports.push(node);
            } else {
                statements.push(node);
            }
        }

        let mut drafts = Vec::new();

        if let Some(draft) = joined_draft(
            ChunkType::Imports,
            "<imports>",
            &imports,
            |node| text(node, src).to_string(),
        ) {
            drafts.push(draft);
        }

        if let Some(draft) = joined_draft(
            ChunkType::ModuleLevel,
            "<module_level_statements>",
            &statements,
            |node| module_statement(node, src),
        ) {
            drafts.push(draft);
        }

        collect_callables(root, src, &mut drafts);
        Ok(drafts)
    }
}

/// One draft from several top-level nodes joined by newlines, or None when
/// their rendered text is blank
fn joined_draft(
    chunk_type: ChunkType,
    name: &str,
    nodes: &[Node],
    render: impl Fn(Node) -> String,
) -> Option<ChunkDraft> {
    let (first, last) = (nodes.first()?, nodes.last()?);
    let content = nodes.iter().map(|n| render(*n)).collect::<Vec<_>>().join("\n");
    if content.trim().is_empty() {
        return None;
    }
    Some(ChunkDraft::new(
        chunk_type,
        name,
        content,
        LineSpan::new(first.start_position().row + 1, last.end_position().row + 1),
    ))
}

/// Top-level statement text, with definitions collapsed to `def name...`
fn module_statement(node: Node, src: &[u8]) -> String {
    let definition = if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    };

    let keyword = match definition.kind() {
        "function_definition" => Some("def"),
        "class_definition" => Some("class"),
        _ => None,
    };

    match (keyword, definition.child_by_field_name("name")) {
        (Some(keyword), Some(name)) => format!("{} {}...", keyword, text(name, src)),
        _ => text(node, src).to_string(),
    }
}

/// Every function and class at any depth, in document order
///
/// A decorated definition starts at its first decorator.
fn collect_callables(node: Node, src: &[u8], drafts: &mut Vec<ChunkDraft>) {
    if matches!(node.kind(), "function_definition" | "class_definition")
        && let Some(name) = node.child_by_field_name("name")
    {
        let outer = match node.parent() {
            Some(parent) if parent.kind() == "decorated_definition" => parent,
            _ => node,
        };
        drafts.push(ChunkDraft::new(
            ChunkType::Callable,
            text(name, src),
            text(outer, src),
            LineSpan::new(
                outer.start_position().row + 1,
                outer.end_position().row + 1,
            ),
        ));
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_callables(child, src, drafts);
    }
}

fn text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or_default()
}

/// Location of the first ERROR or MISSING node, if the tree has any
pub(crate) fn first_syntax_error(root: Node) -> Option<String> {
    if !root.has_error() {
        return None;
    }

    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return Some(format!(
                "syntax error at line {}, column {}",
                pos.row + 1,
                pos.column + 1
            ));
        }
        if node.has_error() {
            let children: Vec<Node> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    Some("syntax error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"from typing import List
import os

x = 1

def func1(a: int) -> str:
    return str(a)

y = 2

class MyClass:
    def method1(self) -> None:
        pass

    @property
    def prop1(self) -> int:
        return 42
"#;

    fn extract(content: &str) -> Vec<ChunkDraft> {
        PythonExtractor.extract("test.py", content).unwrap()
    }

    #[test]
    fn test_can_handle() {
        assert!(PythonExtractor.can_handle(Path::new("test.py")));
        assert!(PythonExtractor.can_handle(Path::new("pkg/stubs.pyi")));
        assert!(!PythonExtractor.can_handle(Path::new("test.txt")));
        assert!(!PythonExtractor.can_handle(Path::new("py")));
    }

    #[test]
    fn test_chunk_names_and_types() {
        let drafts = extract(SAMPLE);
        let names: Vec<_> = drafts.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "<imports>",
                "<module_level_statements>",
                "func1",
                "MyClass",
                "method1",
                "prop1"
            ]
        );
        assert_eq!(drafts[0].chunk_type, ChunkType::Imports);
        assert_eq!(drafts[1].chunk_type, ChunkType::ModuleLevel);
        assert!(drafts[2..].iter().all(|d| d.chunk_type == ChunkType::Callable));
    }

    #[test]
    fn test_imports_and_module_level_content() {
        let drafts = extract(SAMPLE);
        assert_eq!(drafts[0].content, "from typing import List\nimport os");
        assert_eq!(drafts[0].line_span, LineSpan::new(1, 2));
        assert_eq!(
            drafts[1].content,
            "x = 1\ndef func1...\ny = 2\nclass MyClass..."
        );
    }

    #[test]
    fn test_callable_content_and_lines() {
        let drafts = extract(SAMPLE);

        assert_eq!(drafts[2].content, "def func1(a: int) -> str:\n    return str(a)");
        assert_eq!(drafts[2].line_span, LineSpan::new(6, 7));

        assert!(drafts[3].content.starts_with("class MyClass:"));
        assert_eq!(drafts[3].line_span.start, 11);

        assert!(drafts[4].content.contains("def method1(self)"));
        assert_eq!(drafts[4].line_span.start, 12);

        // Decorated definitions start at the decorator
        assert!(drafts[5].content.starts_with("@property"));
        assert!(drafts[5].content.contains("def prop1(self)"));
        assert_eq!(drafts[5].line_span, LineSpan::new(15, 17));
    }

    #[test]
    fn test_decorated_top_level_placeholder() {
        let source = "import functools\n\n@functools.cache\ndef cached():\n    return 1\n";
        let drafts = extract(source);
        assert_eq!(drafts[1].content, "def cached...");
        assert_eq!(drafts[2].name, "cached");
        assert!(drafts[2].content.starts_with("@functools.cache\ndef cached"));
        assert_eq!(drafts[2].line_span.start, 3);
    }

    #[test]
    fn test_comments_omitted_from_module_level() {
        let source = "# header comment\nX = 1  \n# another\n";
        let drafts = extract(source);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].chunk_type, ChunkType::ModuleLevel);
        assert_eq!(drafts[0].content, "X = 1");
    }

    #[test]
    fn test_only_definitions() {
        let drafts = extract("def a():\n    pass\n\ndef b():\n    pass\n");
        let names: Vec<_> = drafts.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["<module_level_statements>", "a", "b"]);
        assert_eq!(drafts[0].content, "def a...\ndef b...");
    }

    #[test]
    fn test_nested_functions_in_document_order() {
        let source = "def outer():\n    def inner():\n        pass\n    return inner\n";
        let names: Vec<_> = extract(source).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["<module_level_statements>", "outer", "inner"]);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = PythonExtractor
            .extract("bad.py", "def broken(:\n    pass\n")
            .unwrap_err();
        match err {
            ExtractionError::ParseFailed { path, reason } => {
                assert_eq!(path, "bad.py");
                assert!(reason.contains("syntax error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(extract(SAMPLE), extract(SAMPLE));
    }
}

use super::python::first_syntax_error;
use super::{ChunkDraft, ChunkExtractor, ChunkType, LineSpan, extension_of};
use crate::error::ExtractionError;
use std::path::Path;
use tree_sitter::{Language, Node, Parser};

/// Grammar plus the node kinds that become callables
struct Grammar {
    language: Language,
    language_name: &'static str,
    target_kinds: &'static [&'static str],
}

/// Tree-sitter extractor for languages without a dedicated extractor
///
/// Emits one Callable per function, method, class, struct, trait or
/// impl-like node, in document order, named after the node's identifier.
pub struct AstParser;

impl AstParser {
    fn grammar(extension: &str) -> Option<Grammar> {
        let (language, language_name, target_kinds): (Language, _, &'static [&'static str]) =
            match extension {
                "rs" => (
                    tree_sitter_rust::LANGUAGE.into(),
                    "Rust",
                    &[
                        "function_item",
                        "impl_item",
                        "trait_item",
                        "struct_item",
                        "enum_item",
                        "mod_item",
                    ],
                ),
                "js" | "mjs" | "cjs" | "jsx" => (
                    tree_sitter_javascript::LANGUAGE.into(),
                    "JavaScript",
                    &[
                        "function_declaration",
                        "generator_function_declaration",
                        "function_expression",
                        "arrow_function",
                        "method_definition",
                        "class_declaration",
                    ],
                ),
                "ts" | "mts" | "cts" => (
                    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                    "TypeScript",
                    TYPESCRIPT_KINDS,
                ),
                "tsx" => (
                    tree_sitter_typescript::LANGUAGE_TSX.into(),
                    "TypeScript",
                    TYPESCRIPT_KINDS,
                ),
                "go" => (
                    tree_sitter_go::LANGUAGE.into(),
                    "Go",
                    &[
                        "function_declaration",
                        "method_declaration",
                        "type_declaration",
                    ],
                ),
                "java" => (
                    tree_sitter_java::LANGUAGE.into(),
                    "Java",
                    &[
                        "method_declaration",
                        "class_declaration",
                        "interface_declaration",
                        "enum_declaration",
                        "constructor_declaration",
                    ],
                ),
                "swift" => (
                    tree_sitter_swift::LANGUAGE.into(),
                    "Swift",
                    &[
                        "function_declaration",
                        "class_declaration",
                        "protocol_declaration",
                        "init_declaration",
                        "deinit_declaration",
                        "subscript_declaration",
                    ],
                ),
                "c" | "h" => (
                    tree_sitter_c::LANGUAGE.into(),
                    "C",
                    &[
                        "function_definition",
                        "struct_specifier",
                        "enum_specifier",
                        "union_specifier",
                    ],
                ),
                "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => (
                    tree_sitter_cpp::LANGUAGE.into(),
                    "C++",
                    &[
                        "function_definition",
                        "class_specifier",
                        "struct_specifier",
                        "enum_specifier",
                        "union_specifier",
                        "namespace_definition",
                    ],
                ),
                "cs" => (
                    tree_sitter_c_sharp::LANGUAGE.into(),
                    "C#",
                    &[
                        "method_declaration",
                        "class_declaration",
                        "struct_declaration",
                        "interface_declaration",
                        "enum_declaration",
                        "namespace_declaration",
                        "constructor_declaration",
                        "property_declaration",
                    ],
                ),
                "rb" => (
                    tree_sitter_ruby::LANGUAGE.into(),
                    "Ruby",
                    &[
                        "method",
                        "singleton_method",
                        "class",
                        "singleton_class",
                        "module",
                    ],
                ),
                "php" => (
                    tree_sitter_php::LANGUAGE_PHP.into(),
                    "PHP",
                    &[
                        "function_definition",
                        "method_declaration",
                        "class_declaration",
                        "interface_declaration",
                        "trait_declaration",
                        "namespace_definition",
                    ],
                ),
                _ => return None,
            };

        Some(Grammar {
            language,
            language_name,
            target_kinds,
        })
    }

    /// Language name for a path, if a grammar is bundled for it
    pub fn language_for(path: &Path) -> Option<&'static str> {
        extension_of(path)
            .and_then(|ext| Self::grammar(&ext))
            .map(|g| g.language_name)
    }
}

const TYPESCRIPT_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
    "class_declaration",
    "abstract_class_declaration",
    "interface_declaration",
    "enum_declaration",
];

impl ChunkExtractor for AstParser {
    fn name(&self) -> &'static str {
        "tree_sitter"
    }

    fn can_handle(&self, path: &Path) -> bool {
        Self::language_for(path).is_some()
    }

    fn extract(&self, path: &str, content: &str) -> Result<Vec<ChunkDraft>, ExtractionError> {
        let grammar = extension_of(Path::new(path))
            .and_then(|ext| Self::grammar(&ext))
            .ok_or_else(|| ExtractionError::UnsupportedLanguage(path.to_string()))?;

        let mut parser = Parser::new();
        parser
            .set_language(&grammar.language)
            .map_err(|e| ExtractionError::ParseFailed {
                path: path.to_string(),
                reason: format!("failed to load {} grammar: {}", grammar.language_name, e),
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

        let mut drafts = Vec::new();
        extract_semantic_units(
            tree.root_node(),
            content.as_bytes(),
            grammar.target_kinds,
            &mut drafts,
        );
        Ok(drafts)
    }
}

/// Extract semantic units (functions, classes, methods) from the AST
fn extract_semantic_units(
    node: Node,
    src: &[u8],
    target_kinds: &[&str],
    result: &mut Vec<ChunkDraft>,
) {
    let kind = node.kind();
    if target_kinds.contains(&kind) {
        let name = node_name(node, src).unwrap_or_else(|| format!("<{}>", kind));
        result.push(ChunkDraft::new(
            ChunkType::Callable,
            name,
            node.utf8_text(src).unwrap_or_default(),
            // Tree-sitter uses 0-indexed rows
            LineSpan::new(node.start_position().row + 1, node.end_position().row + 1),
        ));
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        extract_semantic_units(child, src, target_kinds, result);
    }
}

/// Best-effort identifier of a definition node
fn node_name(node: Node, src: &[u8]) -> Option<String> {
    let text = |n: Node| n.utf8_text(src).ok().map(str::to_string);

    if let Some(name) = node.child_by_field_name("name") {
        return text(name);
    }

    // C and C++ functions name themselves through nested declarators
    if let Some(declarator) = node.child_by_field_name("declarator") {
        return declarator_name(declarator, src);
    }

    // Rust `impl Trait for Type` / `impl Type`
    if node.kind() == "impl_item" {
        let ty = node.child_by_field_name("type").and_then(text)?;
        return Some(match node.child_by_field_name("trait").and_then(text) {
            Some(trait_name) => format!("impl {} for {}", trait_name, ty),
            None => format!("impl {}", ty),
        });
    }

    // Anonymous functions take the name of what they are assigned to
    if let Some(parent) = node.parent() {
        let binding = match parent.kind() {
            "variable_declarator" | "public_field_definition" | "field_definition" => {
                parent.child_by_field_name("name")
            }
            "pair" => parent.child_by_field_name("key"),
            "assignment_expression" => parent.child_by_field_name("left"),
            _ => None,
        };
        if let Some(binding) = binding {
            return text(binding);
        }
    }

    // Wrappers such as Go's `type_declaration` hold a named spec
    let mut cursor = node.walk();
    let named = node
        .named_children(&mut cursor)
        .find_map(|child| child.child_by_field_name("name"));
    named.and_then(text)
}

fn declarator_name(mut declarator: Node, src: &[u8]) -> Option<String> {
    loop {
        match declarator.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
            | "operator_name" | "type_identifier" => {
                return declarator.utf8_text(src).ok().map(str::to_string);
            }
            _ => declarator = declarator.child_by_field_name("declarator")?,
        }
    }
}

//! Language detection from file extensions

/// Detect the language of a file from its extension
pub fn detect_language(extension: &str) -> Option<String> {
    let lang = match extension.to_lowercase().as_str() {
        // Programming languages
        "rs" => "Rust",
        "py" | "pyi" => "Python",
        "js" | "mjs" | "cjs" | "jsx" => "JavaScript",
        "ts" | "mts" | "cts" | "tsx" => "TypeScript",
        "java" => "Java",
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => "C++",
        "c" | "h" => "C",
        "cs" => "C#",
        "go" => "Go",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "kt" | "kts" => "Kotlin",
        "scala" => "Scala",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",

        // Web technologies
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "scss" | "sass" => "SCSS",
        "vue" => "Vue",

        // Data formats and config files
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "xml" => "XML",
        "ini" | "cfg" | "conf" => "Config",

        // Documentation and patches
        "md" | "markdown" => "Markdown",
        "rst" => "reStructuredText",
        "txt" => "Text",
        "diff" | "patch" => "Diff",

        _ => return None,
    };

    Some(lang.to_string())
}

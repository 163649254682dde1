//! Glob pattern matching utilities for path filtering

use globset::{Glob, GlobMatcher};

/// One include/exclude pattern, compiled once
#[derive(Debug, Clone)]
enum PathPattern {
    /// A real glob such as `**/*.rs` or `docs/**`
    Glob(GlobMatcher),
    /// A plain name or path fragment such as `target` or `src/generated`
    Literal(String),
}

/// Matches project-relative, `/`-separated paths against a list of patterns
///
/// Literal patterns match whole path components, so `build` excludes
/// `build/out.txt` and `app/build/x.js` but not `src/builder.rs`.
///
/// # Examples
///
/// ```
/// use chunkyard::glob_utils::PathMatcher;
///
/// let matcher = PathMatcher::new(&["lib/**".to_string(), "target".to_string()]);
/// assert!(matcher.matches("lib/utils.ts"));
/// assert!(matcher.matches("crates/core/target/debug/build.log"));
/// assert!(!matcher.matches("src/targets.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    patterns: Vec<PathPattern>,
}

impl PathMatcher {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|pattern| compile_pattern(pattern.trim()))
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check if a relative path matches any pattern (false when there are none)
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.patterns.iter().any(|pattern| match pattern {
            PathPattern::Glob(matcher) => matches_glob(matcher, path),
            PathPattern::Literal(literal) => matches_literal(literal, path),
        })
    }
}

fn compile_pattern(pattern: &str) -> PathPattern {
    let has_meta = pattern.contains(['*', '?', '[', '{']);
    if !has_meta {
        return PathPattern::Literal(pattern.trim_matches('/').to_string());
    }

    match Glob::new(pattern) {
        Ok(glob) => PathPattern::Glob(glob.compile_matcher()),
        Err(e) => {
            // If glob compilation fails, fall back to literal matching
            tracing::warn!(
                "Invalid glob pattern '{}', falling back to literal match: {}",
                pattern,
                e
            );
            PathPattern::Literal(pattern.trim_matches('/').to_string())
        }
    }
}

fn matches_glob(matcher: &GlobMatcher, path: &str) -> bool {
    if matcher.is_match(path) {
        return true;
    }

    // For patterns like "lib/**", also try matching against path suffixes
    // so "packages/app/lib/file.ts" matches too
    let parts: Vec<&str> = path.split('/').collect();
    (1..parts.len()).any(|i| matcher.is_match(parts[i..].join("/")))
}

fn matches_literal(literal: &str, path: &str) -> bool {
    if literal.contains('/') {
        path == literal
            || path.starts_with(&format!("{literal}/"))
            || path.contains(&format!("/{literal}/"))
            || path.ends_with(&format!("/{literal}"))
    } else {
        path.split('/').any(|component| component == literal)
    }
}

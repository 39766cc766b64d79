//! Markdown file inclusion.
//!
//! `<!-- @include: ./part.md -->` is replaced by the content of `part.md`,
//! resolved relative to the including file (or to the source root for
//! paths starting with `/`). An optional `{start-end}` suffix selects a
//! 1-based, inclusive line range; either bound may be omitted. Directives
//! inside code blocks are not expanded.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{ContentPlugin, DocumentContext, code_block_ranges, enclosing_code_block};
use crate::article::ArticleError;

/// Maximum nesting of included files.
const MAX_DEPTH: usize = 10;

static INCLUDE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*@include:\s*([^\s{}]+)\s*(?:\{(\d*)-(\d*)\})?\s*-->").unwrap()
});

/// Expands `@include` directives.
#[derive(Clone, Copy, Debug, Default)]
pub struct IncludePlugin;

impl ContentPlugin for IncludePlugin {
    fn name(&self) -> &'static str {
        "include"
    }

    fn process(
        &self,
        doc: &DocumentContext<'_>,
        content: &str,
        warnings: &mut Vec<String>,
    ) -> Result<String, ArticleError> {
        resolve_includes(content, doc.source_dir, doc.file, 0, warnings)
    }
}

fn resolve_includes(
    content: &str,
    source_dir: &Path,
    file: &Path,
    depth: usize,
    warnings: &mut Vec<String>,
) -> Result<String, ArticleError> {
    if !content.contains("@include") {
        return Ok(content.to_owned());
    }
    if depth >= MAX_DEPTH {
        warnings.push(format!(
            "Include depth exceeded maximum of {MAX_DEPTH} in {}",
            file.display()
        ));
        return Ok(content.to_owned());
    }

    let blocks = code_block_ranges(content);
    let mut result = String::with_capacity(content.len());
    let mut last = 0;
    let mut pos = 0;

    while let Some(caps) = INCLUDE_PATTERN.captures_at(content, pos) {
        let full = caps.get(0).unwrap();
        if let Some(block) = enclosing_code_block(&blocks, full.start()) {
            pos = block.end;
            continue;
        }
        result.push_str(&content[last..full.start()]);
        last = full.end();
        pos = full.end();

        let target = include_target(&caps[1], source_dir, file);
        let text = match std::fs::read_to_string(&target) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warnings.push(format!("Include file not found: '{}'", &caps[1]));
                result.push_str(full.as_str());
                continue;
            }
            Err(source) => {
                return Err(ArticleError::Io {
                    path: target,
                    source,
                });
            }
        };

        let selected = match line_range(&caps) {
            Ok(range) => select_lines(&text, range),
            Err(message) => {
                warnings.push(format!("Invalid include range for '{}': {message}", &caps[1]));
                result.push_str(full.as_str());
                continue;
            }
        };

        let expanded = resolve_includes(&selected, source_dir, &target, depth + 1, warnings)?;
        result.push_str(expanded.trim_end_matches('\n'));
    }

    result.push_str(&content[last..]);
    Ok(result)
}

fn include_target(path: &str, source_dir: &Path, file: &Path) -> PathBuf {
    match path.strip_prefix('/') {
        Some(rooted) => source_dir.join(rooted),
        None => file.parent().unwrap_or(source_dir).join(path),
    }
}

/// Parse the `{start-end}` suffix into 1-based inclusive bounds.
fn line_range(caps: &Captures<'_>) -> Result<(Option<usize>, Option<usize>), String> {
    let bound = |idx: usize| -> Result<Option<usize>, String> {
        match caps.get(idx).map(|m| m.as_str()) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(|e| format!("{e}")),
        }
    };
    let start = bound(2)?;
    let end = bound(3)?;

    if start == Some(0) {
        return Err("line numbers start at 1".to_owned());
    }
    if let (Some(s), Some(e)) = (start, end)
        && s > e
    {
        return Err(format!("start {s} is after end {e}"));
    }
    Ok((start, end))
}

fn select_lines(text: &str, (start, end): (Option<usize>, Option<usize>)) -> String {
    if start.is_none() && end.is_none() {
        return text.to_owned();
    }
    let skip = start.map_or(0, |s| s - 1);
    let take = end.map_or(usize::MAX, |e| e - skip);
    text.lines().skip(skip).take(take).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn run(root: &Path, file: &str, content: &str) -> (String, Vec<String>) {
        let file = root.join(file);
        let doc = DocumentContext {
            source_dir: root,
            file: &file,
        };
        let mut warnings = Vec::new();
        let out = IncludePlugin.process(&doc, content, &mut warnings).unwrap();
        (out, warnings)
    }

    #[test]
    fn test_include_relative_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("gof")).unwrap();
        std::fs::write(temp.path().join("gof/part.md"), "Included text\n").unwrap();

        let (out, warnings) = run(
            temp.path(),
            "gof/factory.md",
            "before\n\n<!-- @include: ./part.md -->\n\nafter\n",
        );
        assert_eq!(out, "before\n\nIncluded text\n\nafter\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_include_rooted_path() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("shared.md"), "shared").unwrap();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();

        let (out, _) = run(temp.path(), "a/b/page.md", "<!-- @include: /shared.md -->");
        assert_eq!(out, "shared");
    }

    #[test]
    fn test_include_line_range() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("lines.md"), "one\ntwo\nthree\nfour\n").unwrap();

        let (out, _) = run(temp.path(), "page.md", "<!-- @include: ./lines.md{2-3} -->");
        assert_eq!(out, "two\nthree");

        let (out, _) = run(temp.path(), "page.md", "<!-- @include: ./lines.md{3-} -->");
        assert_eq!(out, "three\nfour");

        let (out, _) = run(temp.path(), "page.md", "<!-- @include: ./lines.md{-1} -->");
        assert_eq!(out, "one");
    }

    #[test]
    fn test_invalid_range_warns() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("lines.md"), "one\ntwo\n").unwrap();

        let directive = "<!-- @include: ./lines.md{3-1} -->";
        let (out, warnings) = run(temp.path(), "page.md", directive);
        assert_eq!(out, directive);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("after end"));
    }

    #[test]
    fn test_nested_include_resolves_relative_to_included_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("parts")).unwrap();
        std::fs::write(
            temp.path().join("parts/outer.md"),
            "outer <!-- @include: ./inner.md -->",
        )
        .unwrap();
        std::fs::write(temp.path().join("parts/inner.md"), "inner").unwrap();

        let (out, warnings) = run(temp.path(), "page.md", "<!-- @include: ./parts/outer.md -->");
        assert_eq!(out, "outer inner");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_directive_in_code_block_not_expanded() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("part.md"), "Included").unwrap();

        let content = "```md\n<!-- @include: ./part.md -->\n```\n\n<!-- @include: ./part.md -->\n";
        let (out, warnings) = run(temp.path(), "page.md", content);
        assert_eq!(out, "```md\n<!-- @include: ./part.md -->\n```\n\nIncluded\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_include_keeps_directive() {
        let temp = TempDir::new().unwrap();
        let directive = "<!-- @include: ./missing.md -->";
        let (out, warnings) = run(temp.path(), "page.md", directive);

        assert_eq!(out, directive);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("missing.md"));
    }

    #[test]
    fn test_self_include_stops_at_depth_limit() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("loop.md"), "x<!-- @include: ./loop.md -->").unwrap();

        let (out, warnings) = run(temp.path(), "page.md", "<!-- @include: ./loop.md -->");
        assert_eq!(out.matches('x').count(), MAX_DEPTH);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("depth"));
    }
}

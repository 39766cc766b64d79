//! Routing paths and output locations.
//!
//! - `index.md` and `README.md` map to their directory: `a/README.md` → `/a/`
//! - Other files map to `.html` paths: `a/b.md` → `/a/b.html`
//! - A frontmatter `permalink` overrides both

use std::path::{Component, Path, PathBuf};

use crate::article::ArticleError;

/// Routing path for a source file relative to the source directory.
#[must_use]
pub fn route_for_file(rel_path: &Path) -> String {
    let segments: Vec<String> = rel_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let Some((file, dirs)) = segments.split_last() else {
        return "/".to_owned();
    };

    let stem = file.strip_suffix(".md").unwrap_or(file);
    let mut route = String::from("/");
    for dir in dirs {
        route.push_str(dir);
        route.push('/');
    }

    if !is_index_stem(stem) {
        route.push_str(stem);
        route.push_str(".html");
    }
    route
}

fn is_index_stem(stem: &str) -> bool {
    stem == "index" || stem.eq_ignore_ascii_case("readme")
}

/// Normalize a frontmatter permalink into a routing path.
///
/// # Errors
///
/// Returns [`ArticleError::InvalidPermalink`] for empty permalinks and ones
/// containing `..` segments.
pub fn normalize_permalink(permalink: &str) -> Result<String, ArticleError> {
    let trimmed = permalink.trim();
    let invalid = || ArticleError::InvalidPermalink {
        permalink: permalink.to_owned(),
    };

    if trimmed.is_empty() || trimmed.split('/').any(|seg| seg == "..") {
        return Err(invalid());
    }
    if trimmed.contains(['?', '#']) || trimmed.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    if trimmed.starts_with('/') {
        Ok(trimmed.to_owned())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

/// Output file for a routing path, relative to the output directory.
///
/// `/a/` → `a/index.json`, `/a/b.html` → `a/b.json`, `/a/b` → `a/b.json`.
#[must_use]
pub fn output_file(route: &str) -> PathBuf {
    let trimmed = route.trim_start_matches('/');
    let relative = if trimmed.is_empty() || trimmed.ends_with('/') {
        format!("{trimmed}index.json")
    } else {
        let stem = trimmed.strip_suffix(".html").unwrap_or(trimmed);
        format!("{stem}.json")
    };
    PathBuf::from(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_route_for_file() {
        let cases = [
            ("README.md", "/"),
            ("index.md", "/"),
            ("gof/README.md", "/gof/"),
            ("gof/creational/index.md", "/gof/creational/"),
            ("gof/factory.md", "/gof/factory.html"),
            ("intro.md", "/intro.html"),
            ("cache/redis/readme.md", "/cache/redis/"),
        ];
        for (file, expected) in cases {
            assert_eq!(route_for_file(Path::new(file)), expected, "{file}");
        }
    }

    #[test]
    fn test_normalize_permalink() {
        assert_eq!(
            normalize_permalink("/article/lyeq7xvt/").unwrap(),
            "/article/lyeq7xvt/"
        );
        assert_eq!(normalize_permalink("article/x/").unwrap(), "/article/x/");
    }

    #[test]
    fn test_normalize_permalink_rejects_traversal() {
        for bad in ["", "  ", "/../etc/", "/a/../b", "/a b/", "/a?x=1"] {
            assert!(
                matches!(
                    normalize_permalink(bad),
                    Err(ArticleError::InvalidPermalink { .. })
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_output_file() {
        assert_eq!(output_file("/"), PathBuf::from("index.json"));
        assert_eq!(output_file("/a/"), PathBuf::from("a/index.json"));
        assert_eq!(output_file("/a/b.html"), PathBuf::from("a/b.json"));
        assert_eq!(
            output_file("/article/lyeq7xvt/"),
            PathBuf::from("article/lyeq7xvt/index.json")
        );
        assert_eq!(output_file("/a/b"), PathBuf::from("a/b.json"));
    }
}

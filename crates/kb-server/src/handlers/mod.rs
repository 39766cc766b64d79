//! HTTP request handlers.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

pub(crate) mod pages;
pub(crate) mod site;

/// Prefix of JSON endpoints; misses under it get JSON errors.
pub(crate) const API_PREFIX: &str = "/api";

/// Whether a request path belongs to the JSON API.
pub(crate) fn is_api_path(path: &str) -> bool {
    path.strip_prefix(API_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Percent-decode a request path.
///
/// Returns `None` if the decoded bytes are not valid UTF-8.
pub(crate) fn decode_path(path: &str) -> Option<Cow<'_, str>> {
    percent_decode_str(path).decode_utf8().ok()
}

/// Convert a wildcard capture (without leading slash) to a routing path.
pub(crate) fn to_route(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Strip the site base from a request path.
///
/// Returns `None` if the request is outside the base. `base` starts and
/// ends with `/`.
pub(crate) fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base == "/" {
        return Some(path);
    }
    if let Some(rest) = path.strip_prefix(base.trim_end_matches('/')) {
        if rest.is_empty() {
            return Some("/");
        }
        if rest.starts_with('/') {
            return Some(rest);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_route() {
        assert_eq!(to_route(""), "/");
        assert_eq!(to_route("article/x/"), "/article/x/");
        assert_eq!(to_route("gof/factory.html"), "/gof/factory.html");
    }

    #[test]
    fn test_is_api_path() {
        assert!(is_api_path("/api"));
        assert!(is_api_path("/api/nope"));
        assert!(!is_api_path("/apiary/"));
        assert!(!is_api_path("/article/api/"));
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(
            decode_path("/%E8%AE%BE%E8%AE%A1%E6%A8%A1%E5%BC%8F/").as_deref(),
            Some("/设计模式/")
        );
        assert_eq!(decode_path("/a%20b.html").as_deref(), Some("/a b.html"));
        assert_eq!(decode_path("/plain/").as_deref(), Some("/plain/"));
        assert_eq!(decode_path("/%FF/"), None);
    }

    #[test]
    fn test_strip_base() {
        assert_eq!(strip_base("/a/b.html", "/"), Some("/a/b.html"));
        assert_eq!(strip_base("/kb/a/", "/kb/"), Some("/a/"));
        assert_eq!(strip_base("/kb", "/kb/"), Some("/"));
        assert_eq!(strip_base("/kbx/a", "/kb/"), None);
        assert_eq!(strip_base("/other/", "/kb/"), None);
    }
}

//! Article endpoints.
//!
//! `/api/pages/{*path}` returns the JSON bundle of an article; every other
//! GET path outside `/api` is served as an HTML document. Both use the exact
//! (percent-decoded) routing path with no fuzzy matching.

use std::fmt::Write;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use kb_site::{ArticleRenderUnit, PageBundle};
use md5::{Digest, Md5};

use crate::error::ServerError;
use crate::handlers::{decode_path, is_api_path, strip_base, to_route};
use crate::state::AppState;

/// Handle GET /api/pages/ (root page).
pub(crate) async fn get_root_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    page_bundle(&state, "/", &headers)
}

/// Handle GET /api/pages/{path}.
pub(crate) async fn get_page(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    page_bundle(&state, &to_route(&path), &headers)
}

fn page_bundle(state: &AppState, route: &str, headers: &HeaderMap) -> Result<Response, ServerError> {
    let unit = state
        .site
        .resolve(route)
        .map_err(|e| ServerError::PageNotFound(e.path))?;

    let body = serde_json::to_string(&PageBundle::from(unit))?;
    let etag = compute_etag(&state.version, &body);
    if matches_etag(headers, &etag) {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_owned()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "private, max-age=60".to_owned()),
        ],
        body,
    )
        .into_response())
}

/// Serve an article as an HTML document (router fallback).
pub(crate) async fn get_document(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let raw = uri.path();
    if is_api_path(raw) {
        return Err(ServerError::PageNotFound(raw.to_owned()));
    }
    if method != Method::GET && method != Method::HEAD {
        return Err(ServerError::MethodNotAllowed);
    }

    let path =
        decode_path(raw).ok_or_else(|| ServerError::DocumentNotFound(raw.to_owned()))?;
    let route = strip_base(&path, &state.site.config().site.base)
        .ok_or_else(|| ServerError::DocumentNotFound(path.to_string()))?;
    let unit = state
        .site
        .resolve(route)
        .map_err(|e| ServerError::DocumentNotFound(e.path))?;

    let html = render_document(&state, unit);
    let etag = compute_etag(&state.version, &html);
    if matches_etag(&headers, &etag) {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let mut response = Html(html).into_response();
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response.headers_mut().insert(header::ETAG, value);
    }
    Ok(response)
}

/// Wrap article markup in a minimal HTML document.
fn render_document(state: &AppState, unit: &ArticleRenderUnit) -> String {
    let site = &state.site.config().site;
    let meta = unit.metadata();
    let mut out = String::with_capacity(512);

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\n",
        lang = escape_html(&meta.lang),
    );
    if site.title.is_empty() {
        let _ = writeln!(out, "<title>{}</title>", escape_html(&meta.title));
    } else {
        let _ = writeln!(
            out,
            "<title>{} | {}</title>",
            escape_html(&meta.title),
            escape_html(&site.title)
        );
    }
    if !site.description.is_empty() {
        let _ = writeln!(
            out,
            "<meta name=\"description\" content=\"{}\">",
            escape_html(&site.description)
        );
    }
    let _ = write!(
        out,
        "</head>\n<body>\n<main class=\"vp-doc\">\n{}</main>\n</body>\n</html>\n",
        unit.render()
    );
    out
}

fn matches_etag(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .is_some_and(|value| value.as_bytes() == etag.as_bytes())
}

/// Compute `ETag` from version and content.
///
/// Uses MD5 hash truncated to 64 bits (16 hex chars).
fn compute_etag(version: &str, content: &str) -> String {
    let hash = Md5::digest(format!("{version}:{content}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}

/// Escape HTML special characters.
pub(crate) fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_etag_includes_version() {
        assert_ne!(compute_etag("1.0.0", "content"), compute_etag("1.0.1", "content"));
    }

    #[test]
    fn test_compute_etag_includes_content() {
        assert_ne!(compute_etag("1.0.0", "a"), compute_etag("1.0.0", "b"));
    }

    #[test]
    fn test_compute_etag_format() {
        let etag = compute_etag("1.0.0", "content");
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        assert_eq!(etag.len(), 18);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }
}

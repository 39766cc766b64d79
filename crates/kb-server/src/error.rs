//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No article at the given routing path (API request).
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// No article at the given routing path (document request).
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Request method other than GET or HEAD.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Host and port do not form a socket address.
    #[error("Invalid listen address {address}: {message}")]
    InvalidAddress { address: String, message: String },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::PageNotFound(path) => (
                StatusCode::NOT_FOUND,
                json!({"error": "Page not found", "path": path}),
            ),
            Self::DocumentNotFound(path) => {
                return (StatusCode::NOT_FOUND, Html(not_found_page(path))).into_response();
            }
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({"error": "Method not allowed"}),
            ),
            Self::InvalidAddress { .. } | Self::Json(_) | Self::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": self.to_string()}),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn not_found_page(path: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>404 Not Found</title></head>\
         <body><h1>404</h1><p>No page at <code>{}</code>.</p></body></html>\n",
        crate::handlers::pages::escape_html(path)
    )
}

//! Site summary endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::state::AppState;

/// Handle GET /api/site.
///
/// Returns language, title, description, base, navigation and all routes.
pub(crate) async fn get_site(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.site.manifest()).into_response()
}

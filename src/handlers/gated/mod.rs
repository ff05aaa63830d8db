// handlers/gated/mod.rs - front-end pages behind the active-shop gate
use axum::{extract::State, http::Uri, response::Response};

use crate::state::AppState;

/// Hand the request path to the page renderer
pub async fn render_page(State(state): State<AppState>, uri: Uri) -> Response {
    state.pages.render(uri.path()).await
}

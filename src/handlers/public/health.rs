// handlers/public/health.rs - GET /health

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::middleware::ApiResponse;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();
    let store = if state.config.database.url.is_some() {
        "postgres"
    } else {
        "memory"
    };

    match state.tokens.health_check().await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "version": env!("CARGO_PKG_VERSION"),
            "store": store,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "token store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": store,
                    }
                })),
            )
                .into_response()
        }
    }
}

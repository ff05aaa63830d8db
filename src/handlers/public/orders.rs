// handlers/public/orders.rs - GET /api/get-order?id=

use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{summarize, OrderSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub id: Option<String>,
}

/// Delivery summary of one order of the configured target shop
pub async fn get_order(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<OrderSummary> {
    let id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing order id"))?;
    if !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request("Order id must be numeric"));
    }

    let payload = state.platform.get_order(id).await?;
    let summary = summarize(payload.get("order").unwrap_or(&Value::Null));

    tracing::info!(
        order_id = %id,
        items = summary.items.len(),
        order_type = ?summary.order_type,
        "Order summarized"
    );
    Ok(ApiResponse::success(summary))
}

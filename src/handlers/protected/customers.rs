// handlers/protected/customers.rs - GET /api/customers/:id/metafields

use axum::extract::{Extension, Path, State};
use serde_json::{json, Value};

use crate::auth::{sanitize_shop, AuthError, ShopSession};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

const QUIZ_DOGS_KEY: &str = "quiz_dogs";

/// Customer metafields plus the `quiz_dogs` entry pulled out on its own.
///
/// Lookups run against the configured target shop with its admin token, so
/// only a session for that same shop may ask.
pub async fn customer_metafields(
    State(state): State<AppState>,
    Extension(session): Extension<ShopSession>,
    Path(customer_id): Path<String>,
) -> ApiResult<Value> {
    if customer_id.is_empty() || !customer_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request("Customer id must be numeric"));
    }

    let target = state
        .config
        .shopify
        .shop
        .as_deref()
        .and_then(sanitize_shop)
        .ok_or_else(|| ApiError::service_unavailable("Target shop is not configured"))?;
    if session.shop != target {
        return Err(AuthError::ForeignShop(session.shop).into());
    }

    let payload = state.platform.get_customer_metafields(&customer_id).await?;
    let metafields = payload
        .get("metafields")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let quiz_dogs = metafields
        .iter()
        .find(|mf| mf.get("key").and_then(Value::as_str) == Some(QUIZ_DOGS_KEY))
        .cloned()
        .unwrap_or(Value::Null);

    tracing::info!(
        shop = %session.shop,
        customer_id = %customer_id,
        count = metafields.len(),
        "Customer metafields fetched"
    );
    Ok(ApiResponse::success(json!({
        "metafields": metafields,
        "quizDogs": quiz_dogs,
    })))
}

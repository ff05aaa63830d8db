// handlers/webhooks/compliance.rs - mandatory privacy webhooks
//
// POST /webhooks/customers/redact
// POST /webhooks/shop/redact
// POST /webhooks/customers/data_request

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
};
use serde_json::Value;

use super::{parse_payload, webhook_shop};
use crate::middleware::WebhookContext;
use crate::state::AppState;

fn customer_id(payload: &Value) -> Option<String> {
    payload
        .get("customer")
        .and_then(|c| c.get("id"))
        .filter(|id| !id.is_null())
        .map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

/// No per-customer data is stored, so there is nothing to erase
pub async fn customers_redact(
    Extension(context): Extension<WebhookContext>,
    body: Bytes,
) -> StatusCode {
    let payload = parse_payload(&body);
    tracing::info!(
        shop = ?webhook_shop(&context, &payload),
        customer_id = ?customer_id(&payload),
        "Customer redaction requested; no customer data held"
    );
    StatusCode::OK
}

/// Acknowledge at once and erase the shop's data in the background
pub async fn shop_redact(
    State(state): State<AppState>,
    Extension(context): Extension<WebhookContext>,
    body: Bytes,
) -> StatusCode {
    let payload = parse_payload(&body);
    let Some(shop) = webhook_shop(&context, &payload) else {
        tracing::warn!("shop/redact delivery without a usable shop domain");
        return StatusCode::OK;
    };

    tracing::info!(shop = %shop, "Shop redaction requested");
    tokio::spawn(async move {
        if let Err(e) = state.forget_shop(&shop).await {
            tracing::error!(shop = %shop, "Shop redaction failed: {}", e);
        }
    });
    StatusCode::OK
}

pub async fn customers_data_request(
    Extension(context): Extension<WebhookContext>,
    body: Bytes,
) -> StatusCode {
    let payload = parse_payload(&body);
    tracing::info!(
        shop = ?webhook_shop(&context, &payload),
        customer_id = ?customer_id(&payload),
        "Customer data request received; no customer data held"
    );
    StatusCode::OK
}

// handlers/webhooks/mod.rs - webhook deliveries (signature already verified)
//
// Every handler answers 200 once the signature checks out; failures are
// logged so the platform does not keep redelivering.
pub mod app;
pub mod compliance;

pub use app::app_webhook;
pub use compliance::{customers_data_request, customers_redact, shop_redact};

use serde_json::Value;

use crate::auth::sanitize_shop;
use crate::middleware::WebhookContext;

/// Shop a delivery is about: the domain header, else `shop_domain` in the body
pub(crate) fn webhook_shop(context: &WebhookContext, payload: &Value) -> Option<String> {
    context
        .shop_domain
        .as_deref()
        .or_else(|| payload.get("shop_domain").and_then(Value::as_str))
        .and_then(sanitize_shop)
}

pub(crate) fn parse_payload(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::warn!("Webhook body is not JSON: {}", e);
        Value::Null
    })
}

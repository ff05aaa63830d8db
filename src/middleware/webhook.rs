use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;

use crate::auth::{hmac, AuthError};
use crate::error::ApiError;
use crate::state::AppState;

pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
pub const TOPIC_HEADER: &str = "x-shopify-topic";
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";
pub const WEBHOOK_ID_HEADER: &str = "x-shopify-webhook-id";

/// Delivery metadata of a webhook whose signature checked out
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WebhookContext {
    pub topic: Option<String>,
    pub shop_domain: Option<String>,
    pub webhook_id: Option<String>,
}

impl WebhookContext {
    fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            topic: header(TOPIC_HEADER),
            shop_domain: header(SHOP_DOMAIN_HEADER),
            webhook_id: header(WEBHOOK_ID_HEADER),
        }
    }
}

/// Verify the base64 HMAC of the raw body before any webhook handler runs.
///
/// The body is buffered (up to the configured limit) and handed on intact.
pub async fn verify_webhook(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let limit = state.config.server.max_webhook_body_bytes;
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("Unreadable webhook body: {}", err);
            return ApiError::bad_request("Webhook body could not be read").into_response();
        }
    };

    let signature = parts
        .headers
        .get(HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if signature.is_empty()
        || !hmac::verify_webhook(&bytes, signature, state.config.shopify.api_secret.expose_secret())
    {
        tracing::warn!(path = %parts.uri.path(), "Webhook signature rejected");
        return ApiError::from(AuthError::InvalidSignature).into_response();
    }

    let context = WebhookContext::from_headers(&parts.headers);
    tracing::info!(
        topic = ?context.topic,
        shop = ?context.shop_domain,
        webhook_id = ?context.webhook_id,
        "Webhook received"
    );
    parts.extensions.insert(context);

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

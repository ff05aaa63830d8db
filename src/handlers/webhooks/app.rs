// handlers/webhooks/app.rs - POST /webhooks (topic-dispatched app webhooks)

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
};

use super::{parse_payload, webhook_shop};
use crate::middleware::WebhookContext;
use crate::state::AppState;

const APP_UNINSTALLED: &str = "app/uninstalled";

pub async fn app_webhook(
    State(state): State<AppState>,
    Extension(context): Extension<WebhookContext>,
    body: Bytes,
) -> StatusCode {
    match context.topic.as_deref() {
        Some(APP_UNINSTALLED) => {
            let payload = parse_payload(&body);
            match webhook_shop(&context, &payload) {
                Some(shop) => {
                    if let Err(e) = state.forget_shop(&shop).await {
                        tracing::error!(shop = %shop, "Failed to forget uninstalled shop: {}", e);
                    } else {
                        tracing::info!(shop = %shop, "App uninstalled");
                    }
                }
                None => tracing::warn!("app/uninstalled delivery without a usable shop domain"),
            }
        }
        Some(topic) => tracing::info!(topic = %topic, "Ignoring webhook topic"),
        None => tracing::warn!("Webhook delivery without a topic header"),
    }
    StatusCode::OK
}

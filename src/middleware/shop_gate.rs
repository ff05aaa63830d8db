use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::auth::{oauth, sanitize_shop, AuthError};
use crate::error::ApiError;
use crate::state::AppState;

/// Shop that passed the gate, injected into request extensions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveShop {
    pub shop: String,
}

#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub shop: Option<String>,
    /// `1` when the admin loads the app inside its iframe
    pub embedded: Option<String>,
}

impl ShopQuery {
    pub fn is_embedded(&self) -> bool {
        self.embedded.as_deref() == Some("1")
    }
}

/// Gate for embedded pages: unknown shops are sent through `/auth`.
///
/// With `enforce_shop_verification` off every request proceeds; a valid
/// `shop` parameter is still attached so handlers see the same extension.
pub async fn verify_active_shop(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = query.shop.as_deref().map(str::trim).filter(|s| !s.is_empty());

    if !state.config.security.enforce_shop_verification {
        tracing::debug!(path = %request.uri().path(), "Shop verification disabled; passing request through");
        if let Some(shop) = raw.and_then(sanitize_shop) {
            request.extensions_mut().insert(ActiveShop { shop });
        }
        return Ok(next.run(request).await);
    }

    let raw = raw.ok_or(AuthError::MissingShop)?;
    let shop = sanitize_shop(raw).ok_or_else(|| AuthError::InvalidShop(raw.to_string()))?;

    if !state.is_shop_active(&shop).await? {
        tracing::info!(shop = %shop, "Unknown shop, redirecting to auth");
        let target = oauth::begin_auth_path(&shop, query.is_embedded());
        return Ok(Redirect::to(&target).into_response());
    }

    request.extensions_mut().insert(ActiveShop { shop });
    Ok(next.run(request).await)
}

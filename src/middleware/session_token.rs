use axum::{
    extract::{Query, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::shop_gate::ShopQuery;
use crate::auth::{oauth, sanitize_shop, session_token, AuthError, ShopSession};
use crate::error::ApiError;
use crate::state::AppState;

pub const REAUTHORIZE_HEADER: &str = "x-shopify-api-request-failure-reauthorize";
pub const REAUTHORIZE_URL_HEADER: &str = "x-shopify-api-request-failure-reauthorize-url";

/// Require a valid session token from the embedded front end plus a stored
/// shop record. Injects the `ShopSession` and the stored `Shop`.
pub async fn require_session_token(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
    mut request: Request,
    next: Next,
) -> Response {
    let hinted_shop = query.shop.as_deref().and_then(sanitize_shop);

    let session = match session_token::bearer_token(request.headers())
        .and_then(|token| session_token::verify(token, &state.config.shopify))
    {
        Ok(session) => session,
        Err(err) => return reauthorize(hinted_shop.as_deref(), err),
    };

    let record = match state.tokens.get_shop(&session.shop).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            let shop = session.shop.clone();
            return reauthorize(
                Some(&shop),
                AuthError::InvalidToken(format!("no stored credentials for {}", shop)),
            );
        }
        Err(err) => return ApiError::from(err).into_response(),
    };

    tracing::debug!(shop = %session.shop, "Session token accepted");
    request.extensions_mut().insert::<ShopSession>(session);
    request.extensions_mut().insert(record);
    next.run(request).await
}

/// 403 telling the embedded front end to restart OAuth for `shop`
pub fn reauthorize(shop: Option<&str>, err: AuthError) -> Response {
    tracing::warn!(shop = ?shop, "Session token rejected: {}", err);
    let mut response = ApiError::forbidden(err.to_string()).into_response();

    let url = match shop {
        Some(shop) => oauth::begin_auth_path(shop, false),
        None => "/auth".to_string(),
    };
    let headers = response.headers_mut();
    headers.insert(REAUTHORIZE_HEADER, HeaderValue::from_static("1"));
    if let Ok(value) = HeaderValue::from_str(&url) {
        headers.insert(REAUTHORIZE_URL_HEADER, value);
    }
    response
}

// handlers/protected/graphql.rs - POST /graphql

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use secrecy::ExposeSecret;

use crate::database::Shop;
use crate::error::ApiError;
use crate::state::AppState;

/// Relay the body to the shop's Admin GraphQL endpoint with its stored token.
/// Upstream status, content type and body come back untouched.
pub async fn graphql_proxy(
    State(state): State<AppState>,
    Extension(shop): Extension<Shop>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let upstream = state
        .platform
        .graphql(&shop.shop, shop.token.expose_secret(), content_type, body)
        .await?;
    tracing::debug!(shop = %shop.shop, status = upstream.status, "GraphQL proxied");

    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, upstream.body).into_response();
    match upstream
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        Some(value) => response.headers_mut().insert(header::CONTENT_TYPE, value),
        None => response.headers_mut().remove(header::CONTENT_TYPE),
    };
    Ok(response)
}

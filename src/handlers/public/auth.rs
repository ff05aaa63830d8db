// handlers/public/auth.rs - GET /auth and GET /auth/callback (offline OAuth handshake)

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::collections::BTreeMap;
use tower_sessions::Session as HandshakeSession;

use crate::auth::oauth::{self, PendingAuth, PENDING_AUTH_KEY};
use crate::auth::{hmac, sanitize_shop, AuthError};
use crate::database::{Session, Shop};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BeginQuery {
    pub shop: Option<String>,
    pub embedded: Option<String>,
}

fn require_shop(raw: Option<&str>) -> Result<String, AuthError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MissingShop)?;
    sanitize_shop(raw).ok_or_else(|| AuthError::InvalidShop(raw.to_string()))
}

/// GET /auth?shop= - start the handshake.
///
/// Framed requests (`embedded=1`) get a page that reloads `/auth` in the top
/// window. Otherwise the nonce goes into the handshake session and the
/// merchant is sent to the platform's consent screen.
pub async fn auth_begin(
    State(state): State<AppState>,
    handshake: HandshakeSession,
    Query(query): Query<BeginQuery>,
) -> Result<Response, ApiError> {
    let shop = require_shop(query.shop.as_deref())?;

    if query.embedded.as_deref() == Some("1") {
        tracing::info!(shop = %shop, "Embedded auth request, escaping the iframe");
        let target = oauth::top_level_auth_url(&state.config.shopify, &shop);
        return Ok(Html(oauth::top_level_redirect_page(&target)).into_response());
    }

    let nonce = oauth::new_nonce();
    handshake
        .insert(
            PENDING_AUTH_KEY,
            PendingAuth {
                shop: shop.clone(),
                nonce: nonce.clone(),
            },
        )
        .await
        .map_err(AuthError::from)?;

    tracing::info!(shop = %shop, "Starting OAuth handshake");
    let target = oauth::authorization_url(&state.config.shopify, &shop, &nonce);
    Ok(Redirect::to(&target).into_response())
}

/// GET /auth/callback - finish the handshake.
///
/// The shop record is written first and the offline session second; a failed
/// session write removes the record again. Only then is the cache warmed and
/// the merchant redirected into the app.
pub async fn auth_callback(
    State(state): State<AppState>,
    handshake: HandshakeSession,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, ApiError> {
    let shop = require_shop(params.get("shop").map(String::as_str))?;

    if !hmac::verify_callback(&params, state.config.shopify.api_secret.expose_secret()) {
        tracing::warn!(shop = %shop, "OAuth callback failed HMAC verification");
        return Err(ApiError::bad_request("Invalid OAuth callback signature"));
    }

    if !consume_pending(&handshake, &shop, params.get("state")).await? {
        tracing::warn!(shop = %shop, "OAuth state missing or stale, restarting handshake");
        return Ok(Redirect::to(&oauth::begin_auth_path(&shop, false)).into_response());
    }

    let code = params
        .get("code")
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let grant = state.platform.exchange_code(&shop, code).await?;
    let token = grant.access_token.expose_secret();

    state
        .tokens
        .upsert_shop(&Shop::new(shop.as_str(), token, grant.scope.as_str()))
        .await?;
    if let Err(err) = state
        .sessions
        .store_session(&Session::offline(&shop, token, &grant.scope))
        .await
    {
        if let Err(cleanup) = state.tokens.delete_shop(&shop).await {
            tracing::error!(shop = %shop, "Could not roll back shop record: {}", cleanup);
        }
        return Err(err.into());
    }
    state.active_shops.insert(&shop, &grant.scope).await;

    tracing::info!(shop = %shop, scope = %grant.scope, "OAuth handshake complete");
    let target = oauth::app_root_url(&shop, params.get("host").map(String::as_str));
    Ok(Redirect::to(&target).into_response())
}

/// The `state` parameter must match the handshake session opened by
/// `/auth` for the same shop. The session is spent either way.
async fn consume_pending(
    handshake: &HandshakeSession,
    shop: &str,
    returned: Option<&String>,
) -> Result<bool, ApiError> {
    let pending: Option<PendingAuth> = handshake
        .remove(PENDING_AUTH_KEY)
        .await
        .map_err(AuthError::from)?;
    handshake.flush().await.map_err(AuthError::from)?;

    Ok(match (pending, returned) {
        (Some(pending), Some(returned)) => pending.matches(shop, returned),
        _ => false,
    })
}

use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::{sanitize_shop, AuthError};
use crate::config::ShopifyConfig;

/// Claims of the session token the embedded front end sends as a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// `https://{shop}/admin`
    pub iss: String,
    /// `https://{shop}`
    pub dest: String,
    /// API key of the app
    pub aud: String,
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
}

/// Shop identity proven by a valid session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSession {
    pub shop: String,
    pub user: Option<String>,
}

/// Extract the bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Authorization header is not valid UTF-8".into()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidToken(
            "Authorization header must use Bearer token format".into(),
        )),
    }
}

/// Validate signature, audience and lifetime, then resolve the shop from `dest`
pub fn verify(token: &str, config: &ShopifyConfig) -> Result<ShopSession, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.api_key.as_str()]);
    validation.validate_nbf = true;
    validation.leeway = 5;

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.api_secret.expose_secret().as_bytes()),
        &validation,
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    let claims = data.claims;

    let dest_host = claims
        .dest
        .strip_prefix("https://")
        .ok_or_else(|| AuthError::InvalidToken("dest claim must be an https URL".into()))?;
    let shop = sanitize_shop(dest_host).ok_or_else(|| AuthError::InvalidShop(dest_host.to_string()))?;

    let issuer_host = claims
        .iss
        .strip_prefix("https://")
        .and_then(|rest| rest.split('/').next())
        .unwrap_or_default();
    if issuer_host != shop {
        return Err(AuthError::InvalidToken("iss and dest claims disagree".into()));
    }

    Ok(ShopSession {
        shop,
        user: claims.sub,
    })
}

/// Sign a session token the way the platform does
pub fn sign(claims: &SessionClaims, secret: &str) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

impl SessionClaims {
    /// Claims for `shop` valid for the next `ttl_secs` seconds
    pub fn for_shop(shop: &str, api_key: &str, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            iss: format!("https://{}/admin", shop),
            dest: format!("https://{}", shop),
            aud: api_key.to_string(),
            sub: Some("1".to_string()),
            exp: now + ttl_secs,
            nbf: Some(now - 1),
            iat: Some(now),
            jti: Some(uuid::Uuid::new_v4().to_string()),
            sid: None,
        }
    }
}

pub mod active_shops;
pub mod handshake_store;
pub mod hmac;
pub mod oauth;
pub mod session_token;

pub use active_shops::ActiveShops;
pub use handshake_store::HandshakeStore;
pub use session_token::{SessionClaims, ShopSession};

use thiserror::Error;

use crate::error::ApiError;

const SHOP_SUFFIX: &str = ".myshopify.com";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing shop parameter")]
    MissingShop,

    #[error("Invalid shop domain: {0}")]
    InvalidShop(String),

    #[error("Missing session token")]
    MissingToken,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Invalid request signature")]
    InvalidSignature,

    #[error("Shop {0} may not access this resource")]
    ForeignShop(String),

    #[error("OAuth handshake session failed: {0}")]
    Handshake(#[from] tower_sessions::session::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingShop | AuthError::InvalidShop(_) => ApiError::bad_request(err.to_string()),
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::InvalidSignature => {
                tracing::warn!("Authentication failed: {}", err);
                ApiError::unauthorized(err.to_string())
            }
            AuthError::ForeignShop(_) => {
                tracing::warn!("Access denied: {}", err);
                ApiError::forbidden(err.to_string())
            }
            AuthError::Handshake(_) => {
                tracing::error!("{}", err);
                ApiError::internal_server_error("OAuth handshake state unavailable")
            }
        }
    }
}

/// Normalize and validate a shop domain such as `my-store.myshopify.com`.
///
/// Accepts a bare store name (`my-store`) as shorthand. Returns `None` for
/// anything that could redirect off-platform.
pub fn sanitize_shop(raw: &str) -> Option<String> {
    let shop = raw.trim().to_ascii_lowercase();
    let shop = if shop.contains('.') {
        shop
    } else {
        format!("{}{}", shop, SHOP_SUFFIX)
    };

    let name = shop.strip_suffix(SHOP_SUFFIX)?;
    let valid = !name.is_empty()
        && name.len() <= 60
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && name.chars().next().map_or(false, |c| c.is_ascii_alphanumeric());

    valid.then_some(shop)
}

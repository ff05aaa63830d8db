use async_trait::async_trait;
use axum::body::Bytes;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Failures talking to the commerce platform
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Network error calling {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} answered {status}")]
    Status { status: u16, url: String, body: String },

    #[error("Could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Missing configuration: {0}")]
    NotConfigured(&'static str),
}

impl UpstreamError {
    /// Whether an idempotent request may be retried after this failure
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Timeout(_) | UpstreamError::Network { .. } => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            UpstreamError::Decode { .. } | UpstreamError::NotConfigured(_) => false,
        }
    }
}

/// Result of the OAuth authorization-code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct AccessGrant {
    #[serde(deserialize_with = "secret_string")]
    pub access_token: SecretString,
    #[serde(default)]
    pub scope: String,
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Upstream response relayed to the client without modification
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Everything the server needs from the commerce platform.
///
/// Implemented over HTTP by [`super::shopify_client::ShopifyClient`]; tests
/// substitute their own.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Trade an OAuth authorization code for an offline access token
    async fn exchange_code(&self, shop: &str, code: &str) -> Result<AccessGrant, UpstreamError>;

    /// Forward a GraphQL request for `shop`, authenticated with its stored token
    async fn graphql(
        &self,
        shop: &str,
        access_token: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<ProxiedResponse, UpstreamError>;

    /// Raw order JSON (`{"order": {...}}`) from the configured target shop
    async fn get_order(&self, order_id: &str) -> Result<Value, UpstreamError>;

    /// Raw metafields JSON (`{"metafields": [...]}`) for a customer of the target shop
    async fn get_customer_metafields(&self, customer_id: &str) -> Result<Value, UpstreamError>;
}

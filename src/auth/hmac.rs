//! HMAC-SHA256 checks for OAuth callbacks and webhook deliveries.
//!
//! Callbacks carry a hex digest over the sorted query string; webhooks carry a
//! base64 digest over the raw body. Both comparisons go through
//! `Mac::verify_slice`, which is constant-time.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str) -> Option<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).ok()
}

/// Message signed by the platform for OAuth redirects: every parameter except
/// `hmac` and `signature`, sorted by key, joined as `k=v&k=v`.
pub fn callback_message(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != "hmac" && k.as_str() != "signature")
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Verify the `hmac` query parameter of an OAuth callback.
pub fn verify_callback(params: &BTreeMap<String, String>, secret: &str) -> bool {
    let Some(provided) = params.get("hmac") else {
        return false;
    };
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };
    let Some(mut mac) = mac(secret) else {
        return false;
    };
    mac.update(callback_message(params).as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Verify a webhook body against its base64 `X-Shopify-Hmac-Sha256` header.
pub fn verify_webhook(body: &[u8], provided: &str, secret: &str) -> bool {
    let Ok(provided) = STANDARD.decode(provided.trim()) else {
        return false;
    };
    let Some(mut mac) = mac(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

/// Hex digest of a callback query, as the platform computes it.
pub fn sign_callback(params: &BTreeMap<String, String>, secret: &str) -> String {
    let Some(mut mac) = mac(secret) else {
        return String::new();
    };
    mac.update(callback_message(params).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Base64 digest of a webhook body, as the platform computes it.
pub fn sign_webhook(body: &[u8], secret: &str) -> String {
    let Some(mut mac) = mac(secret) else {
        return String::new();
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

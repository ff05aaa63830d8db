// handlers/mod.rs - handlers grouped by the access policy guarding them
//
// public    - no shop context (OAuth handshake, health, legacy order lookup)
// gated     - behind the active-shop gate (front-end pages)
// protected - behind a session token and stored credentials (/graphql, /api/customers)
// webhooks  - behind the webhook HMAC check
pub mod gated;
pub mod protected;
pub mod public;
pub mod webhooks;

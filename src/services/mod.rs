pub mod order_summary;
pub mod pages;
pub mod platform;
pub mod shopify_client;

pub use order_summary::{summarize, OrderSummary};
pub use pages::{PageRenderer, StaticPages};
pub use platform::{AccessGrant, Platform, ProxiedResponse, UpstreamError};
pub use shopify_client::ShopifyClient;

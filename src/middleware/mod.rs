pub mod response;
pub mod session_token;
pub mod shop_gate;
pub mod webhook;

pub use response::{ApiResponse, ApiResult};
pub use session_token::require_session_token;
pub use shop_gate::{verify_active_shop, ActiveShop};
pub use webhook::{verify_webhook, WebhookContext};

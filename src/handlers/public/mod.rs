// handlers/public/mod.rs - endpoints reachable without any shop context
pub mod auth;
pub mod health;
pub mod orders;

pub use auth::{auth_begin, auth_callback};
pub use health::health;
pub use orders::get_order;

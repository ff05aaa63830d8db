pub mod session;
pub mod shop;

pub use session::Session;
pub use shop::Shop;

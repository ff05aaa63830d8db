pub mod manager;
pub mod models;
pub mod session_store;
pub mod token_store;

pub use manager::{DatabaseError, DatabaseManager};
pub use models::{Session, Shop};
pub use session_store::{MemorySessionStore, PgSessionStore, SessionStore};
pub use token_store::{MemoryTokenStore, PgTokenStore, TokenStore};

// handlers/protected/mod.rs - endpoints requiring a session token and stored credentials
//
// The session-token middleware injects `ShopSession` and the stored `Shop`
// into request extensions before these run.
pub mod customers;
pub mod graphql;

pub use customers::customer_metafields;
pub use graphql::graphql_proxy;

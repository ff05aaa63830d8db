//! Short-lived session storage for in-flight OAuth handshakes.
//!
//! The nonce handed to the platform lives in a `tower-sessions` session whose
//! records sit in a bounded moka cache. Nothing is written to the token or
//! session stores until a callback completes.

use async_trait::async_trait;
use moka::future::Cache;
use std::fmt;
use std::time::Duration;
use tower_sessions::cookie::time::{self, OffsetDateTime};
use tower_sessions::cookie::SameSite;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use super::oauth::STATE_TTL_MINUTES;

/// Cookie naming the handshake session; scoped to `/auth`
pub const HANDSHAKE_COOKIE: &str = "shop_gate_handshake";

#[derive(Clone)]
pub struct HandshakeStore {
    records: Cache<Id, Record>,
}

impl HandshakeStore {
    /// Holds at most `capacity` handshakes; each is dropped after the state TTL
    pub fn new(capacity: u64) -> Self {
        Self {
            records: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(Duration::from_secs(STATE_TTL_MINUTES as u64 * 60))
                .build(),
        }
    }

    /// Session layer issuing the handshake cookie
    pub fn layer(&self, secure: bool) -> SessionManagerLayer<HandshakeStore> {
        SessionManagerLayer::new(self.clone())
            .with_name(HANDSHAKE_COOKIE)
            .with_expiry(Expiry::OnInactivity(time::Duration::minutes(STATE_TTL_MINUTES)))
            .with_secure(secure)
            .with_same_site(SameSite::Lax)
            .with_http_only(true)
            .with_path("/auth")
    }

    /// Handshakes currently held
    pub async fn pending(&self) -> u64 {
        self.records.run_pending_tasks().await;
        self.records.entry_count()
    }
}

impl fmt::Debug for HandshakeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeStore")
            .field("entries", &self.records.entry_count())
            .finish()
    }
}

#[async_trait]
impl SessionStore for HandshakeStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.records.insert(record.id.clone(), record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id.clone(), record.clone()).await;
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .records
            .get(id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.records.invalidate(id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(minutes: i64) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::new(),
            expiry_date: OffsetDateTime::now_utc() + time::Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn save_load_delete() {
        let store = HandshakeStore::new(10);
        let mut live = record(5);
        store.create(&mut live).await.unwrap();

        assert!(store.load(&live.id).await.unwrap().is_some());
        store.delete(&live.id).await.unwrap();
        assert!(store.load(&live.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_records_do_not_load() {
        let store = HandshakeStore::new(10);
        let stale = record(-1);
        store.save(&stale).await.unwrap();
        assert!(store.load(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn capacity_bounds_held_handshakes() {
        let store = HandshakeStore::new(50);
        for _ in 0..500 {
            let mut next = record(5);
            store.create(&mut next).await.unwrap();
        }
        assert!(store.pending().await <= 50);
    }
}

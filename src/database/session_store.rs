use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::manager::DatabaseError;
use super::models::Session;

/// Session persistence used by the OAuth handshake.
///
/// Expired sessions load as `None` and are swept whenever a session is stored.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn store_session(&self, session: &Session) -> Result<(), DatabaseError>;

    async fn load_session(&self, id: &str) -> Result<Option<Session>, DatabaseError>;

    async fn delete_session(&self, id: &str) -> Result<bool, DatabaseError>;

    /// Remove every session belonging to `shop`, returning how many were removed
    async fn delete_shop_sessions(&self, shop: &str) -> Result<u64, DatabaseError>;
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn store_session(&self, session: &Session) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM sessions WHERE expires_at IS NOT NULL AND expires_at <= now()")
            .execute(&self.pool)
            .await?;

        let query = r#"
            INSERT INTO sessions (id, shop, payload, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET shop = EXCLUDED.shop,
                payload = EXCLUDED.payload,
                expires_at = EXCLUDED.expires_at
        "#;

        sqlx::query(query)
            .bind(&session.id)
            .bind(&session.shop)
            .bind(Json(session))
            .bind(session.expires)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, DatabaseError> {
        let row = sqlx::query("SELECT payload FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let Json(session): Json<Session> = row
            .try_get("payload")
            .map_err(|e| DatabaseError::Corrupt(format!("session {}: {}", id, e)))?;

        if session.is_expired() {
            self.delete_session(id).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn delete_session(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_shop_sessions(&self, shop: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM sessions WHERE shop = $1")
            .bind(shop)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn store_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, stored| !stored.is_expired());
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<Session>, DatabaseError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(session) if session.is_expired() => {
                sessions.remove(id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, id: &str) -> Result<bool, DatabaseError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn delete_shop_sessions(&self, shop: &str) -> Result<u64, DatabaseError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.shop != shop);
        Ok((before - sessions.len()) as u64)
    }
}

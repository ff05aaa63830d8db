use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::Shop;

/// Durable mapping from shop domain to offline credentials
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_shop(&self, shop: &str) -> Result<Option<Shop>, DatabaseError>;

    /// Insert or overwrite the record keyed by `shop.shop`
    async fn upsert_shop(&self, shop: &Shop) -> Result<(), DatabaseError>;

    /// Returns whether a record was removed
    async fn delete_shop(&self, shop: &str) -> Result<bool, DatabaseError>;

    async fn list_shops(&self) -> Result<Vec<Shop>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn get_shop(&self, shop: &str) -> Result<Option<Shop>, DatabaseError> {
        let row = sqlx::query_as::<_, Shop>("SELECT shop, token, scope FROM shops WHERE shop = $1")
            .bind(shop)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert_shop(&self, shop: &Shop) -> Result<(), DatabaseError> {
        let query = r#"
            INSERT INTO shops (shop, token, scope)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop) DO UPDATE
            SET token = EXCLUDED.token,
                scope = EXCLUDED.scope,
                updated_at = now()
        "#;

        sqlx::query(query)
            .bind(&shop.shop)
            .bind(shop.token.expose_secret())
            .bind(&shop.scope)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_shop(&self, shop: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM shops WHERE shop = $1")
            .bind(shop)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_shops(&self) -> Result<Vec<Shop>, DatabaseError> {
        let rows = sqlx::query_as::<_, Shop>("SELECT shop, token, scope FROM shops ORDER BY shop")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

/// Process-local store used when no database is configured
#[derive(Default)]
pub struct MemoryTokenStore {
    shops: RwLock<HashMap<String, Shop>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_shop(&self, shop: &str) -> Result<Option<Shop>, DatabaseError> {
        Ok(self.shops.read().await.get(shop).cloned())
    }

    async fn upsert_shop(&self, shop: &Shop) -> Result<(), DatabaseError> {
        self.shops
            .write()
            .await
            .insert(shop.shop.clone(), shop.clone());
        Ok(())
    }

    async fn delete_shop(&self, shop: &str) -> Result<bool, DatabaseError> {
        Ok(self.shops.write().await.remove(shop).is_some())
    }

    async fn list_shops(&self) -> Result<Vec<Shop>, DatabaseError> {
        let mut shops: Vec<Shop> = self.shops.read().await.values().cloned().collect();
        shops.sort_by(|a, b| a.shop.cmp(&b.shop));
        Ok(shops)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

use std::sync::Arc;

use crate::auth::{ActiveShops, HandshakeStore};
use crate::config::AppConfig;
use crate::database::{
    DatabaseError, DatabaseManager, MemorySessionStore, MemoryTokenStore, PgSessionStore,
    PgTokenStore, Session, SessionStore, TokenStore,
};
use crate::services::{PageRenderer, Platform, ShopifyClient, StaticPages};

/// Shared per-process state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<dyn TokenStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub active_shops: ActiveShops,
    pub handshakes: HandshakeStore,
    pub platform: Arc<dyn Platform>,
    pub pages: Arc<dyn PageRenderer>,
}

impl AppState {
    /// Wire the production collaborators for `config`.
    ///
    /// PostgreSQL stores when `DATABASE_URL` is set (schema applied on
    /// connect), in-memory stores otherwise.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let (tokens, sessions): (Arc<dyn TokenStore>, Arc<dyn SessionStore>) =
            match config.database.url {
                Some(_) => {
                    let pool = DatabaseManager::connect(&config.database).await?;
                    DatabaseManager::migrate(&pool).await?;
                    tracing::info!("Using PostgreSQL token and session stores");
                    (
                        Arc::new(PgTokenStore::new(pool.clone())),
                        Arc::new(PgSessionStore::new(pool)),
                    )
                }
                None => {
                    tracing::warn!("DATABASE_URL not set; shop tokens will not survive a restart");
                    (
                        Arc::new(MemoryTokenStore::new()),
                        Arc::new(MemorySessionStore::new()),
                    )
                }
            };

        let platform = Arc::new(ShopifyClient::new(&config.shopify, &config.upstream)?);
        let pages = Arc::new(StaticPages::new(config.server.pages_dir.clone()));

        let state = Self::new(config, tokens, sessions, platform, pages);
        state.seed_dev_shops().await;
        Ok(state)
    }

    pub fn new(
        config: AppConfig,
        tokens: Arc<dyn TokenStore>,
        sessions: Arc<dyn SessionStore>,
        platform: Arc<dyn Platform>,
        pages: Arc<dyn PageRenderer>,
    ) -> Self {
        let active_shops = ActiveShops::new(config.security.active_shop_cache_capacity);
        let handshakes = HandshakeStore::new(config.security.handshake_capacity);
        Self {
            config: Arc::new(config),
            tokens,
            sessions,
            active_shops,
            handshakes,
            platform,
            pages,
        }
    }

    /// Whether `shop` finished the handshake: a cache hit, or a stored record
    /// backed by a live offline session (which then warms the cache).
    pub async fn is_shop_active(&self, shop: &str) -> Result<bool, DatabaseError> {
        if self.active_shops.scope(shop).await.is_some() {
            return Ok(true);
        }

        let Some(record) = self.tokens.get_shop(shop).await? else {
            return Ok(false);
        };
        let session = self.sessions.load_session(&Session::offline_id(shop)).await?;
        if !session.map_or(false, |s| s.is_active()) {
            tracing::info!(shop = %shop, "Stored shop has no live offline session");
            return Ok(false);
        }

        self.active_shops.insert(shop, &record.scope).await;
        Ok(true)
    }

    /// Forget everything known about `shop`: token record, sessions and cache entry
    pub async fn forget_shop(&self, shop: &str) -> Result<(), DatabaseError> {
        self.active_shops.evict(shop).await;
        let removed = self.tokens.delete_shop(shop).await?;
        let sessions = self.sessions.delete_shop_sessions(shop).await?;
        tracing::info!(shop = %shop, removed, sessions, "Shop data erased");
        Ok(())
    }

    async fn seed_dev_shops(&self) {
        if !self.config.is_development() {
            return;
        }
        for shop in &self.config.security.dev_active_shops {
            tracing::warn!(shop = %shop, "Seeding active shop for development");
            self.active_shops.insert(shop, "").await;
        }
    }
}

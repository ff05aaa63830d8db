use moka::future::Cache;

/// Process-local cache of shops known to be installed, keyed by domain.
///
/// Starts empty on every process start; the token store remains the source of
/// truth and a miss always falls through to it.
#[derive(Clone)]
pub struct ActiveShops {
    shops: Cache<String, String>,
}

impl ActiveShops {
    pub fn new(capacity: u64) -> Self {
        Self {
            shops: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Granted scope for `shop`, if cached
    pub async fn scope(&self, shop: &str) -> Option<String> {
        self.shops.get(shop).await
    }

    pub async fn insert(&self, shop: &str, scope: &str) {
        self.shops.insert(shop.to_string(), scope.to_string()).await;
    }

    pub async fn evict(&self, shop: &str) {
        self.shops.invalidate(shop).await;
    }

    pub fn contains(&self, shop: &str) -> bool {
        self.shops.contains_key(shop)
    }
}

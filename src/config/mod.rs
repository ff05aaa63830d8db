use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_SCOPES: &str =
    "read_content,write_content,read_script_tags,write_script_tags,read_products,read_themes";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub shopify: ShopifyConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
    Test,
}

#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    pub api_key: String,
    pub api_secret: SecretString,
    pub scopes: Vec<String>,
    /// Externally visible host name, without scheme.
    pub host: String,
    pub api_version: String,
    /// Target shop for order and customer lookups.
    pub shop: Option<String>,
    /// Static token sent as `X-Shopify-Access-Token` on order lookups.
    pub admin_token: SecretString,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub next_static_dir: PathBuf,
    pub max_webhook_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection string, credentials included.
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enforce_shop_verification: bool,
    pub active_shop_cache_capacity: u64,
    /// OAuth handshakes held at once; older ones are evicted past this.
    pub handshake_capacity: u64,
    /// Shops seeded into the active-shop cache at startup. Development only.
    pub dev_active_shops: Vec<String>,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match get("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("test") => Environment::Test,
            Some("development") | Some("dev") | None => Environment::Development,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "APP_ENV",
                    value: other.to_string(),
                })
            }
        };

        let api_key = get("SHOPIFY_API_KEY").ok_or(ConfigError::Missing("SHOPIFY_API_KEY"))?;
        let api_secret =
            get("SHOPIFY_API_SECRET").ok_or(ConfigError::Missing("SHOPIFY_API_SECRET"))?;

        // Set defaults based on environment, then override with specific env vars
        let mut config = match environment {
            Environment::Production => Self::production(api_key, api_secret),
            Environment::Test => Self::test(api_key, api_secret),
            Environment::Development => Self::development(api_key, api_secret),
        };
        config.apply_overrides(get)?;
        Ok(config)
    }

    fn apply_overrides<G>(&mut self, get: G) -> Result<(), ConfigError>
    where
        G: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("SCOPES") {
            self.shopify.scopes = split_list(&v);
        }
        if let Some(v) = get("HOST") {
            self.shopify.host = normalize_host(&v);
        }
        if let Some(v) = get("API_VERSION") {
            self.shopify.api_version = v;
        }
        if let Some(v) = get("SHOP") {
            self.shopify.shop = Some(v);
        }
        if let Some(v) = get("SHOPIFY_ADMIN_TOKEN") {
            self.shopify.admin_token = SecretString::from(v);
        }

        if let Some(v) = get("PORT") {
            self.server.port = parse("PORT", &v)?;
        }
        if let Some(v) = get("STATIC_DIR") {
            self.server.static_dir = PathBuf::from(v);
        }
        if let Some(v) = get("PAGES_DIR") {
            self.server.pages_dir = PathBuf::from(v);
        }
        if let Some(v) = get("NEXT_STATIC_DIR") {
            self.server.next_static_dir = PathBuf::from(v);
        }

        self.database.url = get("DATABASE_URL").map(SecretString::from);
        if let Some(v) = get("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = get("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }

        if let Some(v) = get("ENFORCE_SHOP_VERIFICATION") {
            self.security.enforce_shop_verification = parse("ENFORCE_SHOP_VERIFICATION", &v)?;
        }
        if let Some(v) = get("ACTIVE_SHOP_CACHE_CAPACITY") {
            self.security.active_shop_cache_capacity = parse("ACTIVE_SHOP_CACHE_CAPACITY", &v)?;
        }
        if let Some(v) = get("HANDSHAKE_CAPACITY") {
            self.security.handshake_capacity = parse("HANDSHAKE_CAPACITY", &v)?;
        }
        if let Some(v) = get("DEV_ACTIVE_SHOPS") {
            self.security.dev_active_shops = split_list(&v);
        }

        if let Some(v) = get("UPSTREAM_TIMEOUT_SECS") {
            self.upstream.timeout_secs = parse("UPSTREAM_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("UPSTREAM_MAX_RETRIES") {
            self.upstream.max_retries = parse("UPSTREAM_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("UPSTREAM_RETRY_BACKOFF_MS") {
            self.upstream.retry_backoff_ms = parse("UPSTREAM_RETRY_BACKOFF_MS", &v)?;
        }

        Ok(())
    }

    fn development(api_key: String, api_secret: String) -> Self {
        Self {
            environment: Environment::Development,
            shopify: ShopifyConfig::new(api_key, api_secret),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                enforce_shop_verification: true,
                active_shop_cache_capacity: 1_000,
                handshake_capacity: 1_000,
                dev_active_shops: Vec::new(),
                secure_cookies: false,
            },
            upstream: UpstreamConfig {
                timeout_secs: 30,
                max_retries: 1,
                retry_backoff_ms: 250,
            },
        }
    }

    fn production(api_key: String, api_secret: String) -> Self {
        Self {
            environment: Environment::Production,
            shopify: ShopifyConfig::new(api_key, api_secret),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                enforce_shop_verification: true,
                active_shop_cache_capacity: 10_000,
                handshake_capacity: 10_000,
                dev_active_shops: Vec::new(),
                secure_cookies: true,
            },
            upstream: UpstreamConfig {
                timeout_secs: 10,
                max_retries: 2,
                retry_backoff_ms: 250,
            },
        }
    }

    fn test(api_key: String, api_secret: String) -> Self {
        Self {
            environment: Environment::Test,
            shopify: ShopifyConfig::new(api_key, api_secret),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: None,
                max_connections: 2,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                enforce_shop_verification: true,
                active_shop_cache_capacity: 100,
                handshake_capacity: 100,
                dev_active_shops: Vec::new(),
                secure_cookies: false,
            },
            upstream: UpstreamConfig {
                timeout_secs: 2,
                max_retries: 0,
                retry_backoff_ms: 0,
            },
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

impl ShopifyConfig {
    fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            admin_token: SecretString::from(api_secret.clone()),
            api_secret: SecretString::from(api_secret),
            scopes: split_list(DEFAULT_SCOPES),
            host: "localhost".to_string(),
            api_version: "2023-01".to_string(),
            shop: None,
        }
    }

    /// OAuth redirect target registered with the platform.
    pub fn redirect_uri(&self) -> String {
        format!("https://{}/auth/callback", self.host)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            static_dir: PathBuf::from("public"),
            pages_dir: PathBuf::from(".next/server/pages"),
            next_static_dir: PathBuf::from(".next/static"),
            max_webhook_body_bytes: 2 * 1024 * 1024,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn normalize_host(value: &str) -> String {
    let host = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(value);
    host.trim_end_matches('/').to_string()
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, Request, Response, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use shop_gate::auth::{hmac, session_token, SessionClaims};
use shop_gate::config::AppConfig;
use shop_gate::database::{
    DatabaseError, MemorySessionStore, MemoryTokenStore, Session, SessionStore, Shop, TokenStore,
};
use shop_gate::services::{AccessGrant, Platform, ProxiedResponse, StaticPages, UpstreamError};
use shop_gate::AppState;

pub const API_KEY: &str = "test-api-key";
pub const API_SECRET: &str = "test-api-secret";
pub const SHOP: &str = "test-store.myshopify.com";

// ---------------------------------------------------------------------------
// In-process harness
// ---------------------------------------------------------------------------

/// Platform double: canned responses, records every call
pub struct FakePlatform {
    pub grant_token: Mutex<String>,
    pub fail_exchange: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakePlatform {
    fn new(fail_exchange: bool) -> Self {
        Self {
            grant_token: Mutex::new("shpat_first".to_string()),
            fail_exchange,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_grant_token(&self, token: &str) {
        *self.grant_token.lock().unwrap() = token.to_string();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn sample_order() -> Value {
    json!({
        "id": 4424521646137u64,
        "name": "#1042",
        "tags": "Subscription, Subscription First Order",
        "note_attributes": [{ "name": "__deliveryDate", "value": "2023-03-14" }],
        "line_items": [
            { "sku": "CHK-W30G", "name": "Chicken", "title": "Chicken Pack" },
            { "sku": "BEF-W30G", "name": "Beef", "title": "Beef Pack" },
            { "sku": "TREAT-1", "name": "Treats", "title": "Treats" }
        ]
    })
}

#[async_trait]
impl Platform for FakePlatform {
    async fn exchange_code(&self, shop: &str, code: &str) -> Result<AccessGrant, UpstreamError> {
        self.record(format!("exchange {} {}", shop, code));
        if self.fail_exchange {
            return Err(UpstreamError::Status {
                status: 500,
                url: format!("https://{}/admin/oauth/access_token", shop),
                body: "boom".to_string(),
            });
        }
        Ok(AccessGrant {
            access_token: self.grant_token.lock().unwrap().clone().into(),
            scope: "read_orders,write_orders".to_string(),
        })
    }

    async fn graphql(
        &self,
        shop: &str,
        access_token: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<ProxiedResponse, UpstreamError> {
        self.record(format!("graphql {}", shop));
        let echo = json!({
            "shop": shop,
            "token": access_token,
            "content_type": content_type,
            "echo": String::from_utf8_lossy(&body),
        });
        Ok(ProxiedResponse {
            status: 200,
            content_type: Some("application/json; charset=utf-8".to_string()),
            body: Bytes::from(echo.to_string()),
        })
    }

    async fn get_order(&self, order_id: &str) -> Result<Value, UpstreamError> {
        self.record(format!("order {}", order_id));
        match order_id {
            "404" => Err(UpstreamError::Status {
                status: 404,
                url: "orders/404.json".to_string(),
                body: String::new(),
            }),
            "504" => Err(UpstreamError::Timeout("orders/504.json".to_string())),
            _ => Ok(json!({ "order": sample_order() })),
        }
    }

    async fn get_customer_metafields(&self, customer_id: &str) -> Result<Value, UpstreamError> {
        self.record(format!("metafields {}", customer_id));
        Ok(json!({
            "metafields": [
                { "key": "nickname", "value": "Rex" },
                { "key": "quiz_dogs", "value": "[{\"name\":\"Rex\"}]" }
            ]
        }))
    }
}

/// Token store that knows no shops and fails every write
pub struct FailingTokenStore;

#[async_trait]
impl TokenStore for FailingTokenStore {
    async fn get_shop(&self, _shop: &str) -> Result<Option<Shop>, DatabaseError> {
        Ok(None)
    }

    async fn upsert_shop(&self, _shop: &Shop) -> Result<(), DatabaseError> {
        Err(DatabaseError::Unavailable("connection refused".to_string()))
    }

    async fn delete_shop(&self, _shop: &str) -> Result<bool, DatabaseError> {
        Err(DatabaseError::Unavailable("connection refused".to_string()))
    }

    async fn list_shops(&self) -> Result<Vec<Shop>, DatabaseError> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Err(DatabaseError::Unavailable("connection refused".to_string()))
    }
}

/// Session store whose writes always fail
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn store_session(&self, _session: &Session) -> Result<(), DatabaseError> {
        Err(DatabaseError::Unavailable("connection refused".to_string()))
    }

    async fn load_session(&self, _id: &str) -> Result<Option<Session>, DatabaseError> {
        Ok(None)
    }

    async fn delete_session(&self, _id: &str) -> Result<bool, DatabaseError> {
        Ok(false)
    }

    async fn delete_shop_sessions(&self, _shop: &str) -> Result<u64, DatabaseError> {
        Ok(0)
    }
}

pub struct TestApp {
    pub state: AppState,
    pub platform: Arc<FakePlatform>,
    router: Router,
    _dirs: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(memory_tokens(), memory_sessions(), false, |_| {})
    }

    pub fn configured(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(memory_tokens(), memory_sessions(), false, tweak)
    }

    pub fn with_token_store(tokens: Arc<dyn TokenStore>) -> Self {
        Self::build(tokens, memory_sessions(), false, |_| {})
    }

    pub fn with_session_store(sessions: Arc<dyn SessionStore>) -> Self {
        Self::build(memory_tokens(), sessions, false, |_| {})
    }

    pub fn with_failing_exchange() -> Self {
        Self::build(memory_tokens(), memory_sessions(), true, |_| {})
    }

    fn build(
        tokens: Arc<dyn TokenStore>,
        sessions: Arc<dyn SessionStore>,
        fail_exchange: bool,
        tweak: impl FnOnce(&mut AppConfig),
    ) -> Self {
        let dirs = tempfile::tempdir().expect("tempdir");
        let root = dirs.path();
        for dir in ["pages", "public", "next"] {
            std::fs::create_dir(root.join(dir)).expect("fixture dir");
        }
        std::fs::write(root.join("pages/index.html"), "<h1>app home</h1>").expect("fixture");
        std::fs::write(root.join("pages/orders.html"), "<h1>orders</h1>").expect("fixture");
        std::fs::write(root.join("public/robots.txt"), "User-agent: *").expect("fixture");
        std::fs::write(root.join("next/chunk.js"), "console.log(1)").expect("fixture");

        let mut config = AppConfig::from_lookup(|key| match key {
            "SHOPIFY_API_KEY" => Some(API_KEY.to_string()),
            "SHOPIFY_API_SECRET" => Some(API_SECRET.to_string()),
            "HOST" => Some("https://app.example.com".to_string()),
            "APP_ENV" => Some("test".to_string()),
            "SHOP" => Some(SHOP.to_string()),
            _ => None,
        })
        .expect("test config");
        config.server.pages_dir = root.join("pages");
        config.server.static_dir = root.join("public");
        config.server.next_static_dir = root.join("next");
        tweak(&mut config);

        let platform = Arc::new(FakePlatform::new(fail_exchange));
        let pages = Arc::new(StaticPages::new(config.server.pages_dir.clone()));
        let state = AppState::new(config, tokens, sessions, platform.clone(), pages);
        let router = shop_gate::app(state.clone());

        Self {
            state,
            platform,
            router,
            _dirs: dirs,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).expect("request")).await
    }

    /// Persist a shop the way a completed handshake does, without warming the cache
    pub async fn install_shop(&self, shop: &str, token: &str) {
        self.state
            .sessions
            .store_session(&Session::offline(shop, token, "read_orders"))
            .await
            .expect("store session");
        self.state
            .tokens
            .upsert_shop(&Shop::new(shop, token, "read_orders"))
            .await
            .expect("store shop");
    }

    /// Run `GET /auth` and keep the nonce handed to the platform plus the
    /// handshake cookie the browser would send back
    pub async fn begin_auth(&self, shop: &str) -> Handshake {
        let response = self.get(&format!("/auth?shop={}", shop)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = set_cookie(&response)
            .split(';')
            .next()
            .unwrap_or_default()
            .to_string();
        let target = url::Url::parse(&location(&response)).expect("authorize url");
        let nonce = target
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("state parameter");
        Handshake { nonce, cookie }
    }

    /// Deliver a signed OAuth callback returning `state` with the handshake cookie
    pub async fn callback(&self, shop: &str, state: &str, cookie: &str, code: &str) -> Response<Body> {
        let query = signed_callback_query(&[
            ("shop", shop),
            ("code", code),
            ("state", state),
            ("host", "YWRtaW4uc2hvcGlmeS5jb20="),
            ("timestamp", "1700000000"),
        ]);
        let request = Request::get(format!("/auth/callback?{}", query))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    /// Full handshake for `shop`
    pub async fn complete_auth(&self, shop: &str, code: &str) -> Response<Body> {
        let handshake = self.begin_auth(shop).await;
        self.callback(shop, &handshake.nonce, &handshake.cookie, code).await
    }
}

fn memory_tokens() -> Arc<dyn TokenStore> {
    Arc::new(MemoryTokenStore::new())
}

fn memory_sessions() -> Arc<dyn SessionStore> {
    Arc::new(MemorySessionStore::new())
}

/// Nonce and cookie issued by `GET /auth`
pub struct Handshake {
    pub nonce: String,
    pub cookie: String,
}

pub fn session_token(shop: &str) -> String {
    session_token::sign(&SessionClaims::for_shop(shop, API_KEY, 60), API_SECRET).expect("sign token")
}

pub fn signed_callback_query(params: &[(&str, &str)]) -> String {
    let mut map: BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let signature = hmac::sign_callback(&map, API_SECRET);
    map.insert("hmac".to_string(), signature);

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in &map {
        query.append_pair(k, v);
    }
    query.finish()
}

pub fn webhook_request(path: &str, topic: &str, shop: &str, body: &str, secret: &str) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-shopify-hmac-sha256", hmac::sign_webhook(body.as_bytes(), secret))
        .header("x-shopify-topic", topic)
        .header("x-shopify-shop-domain", shop)
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn set_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

// ---------------------------------------------------------------------------
// Spawned-binary harness
// ---------------------------------------------------------------------------

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_shop-gate"));
        cmd.arg("serve")
            .env("PORT", port.to_string())
            .env("APP_ENV", "test")
            .env("SHOPIFY_API_KEY", API_KEY)
            .env("SHOPIFY_API_SECRET", API_SECRET)
            // Empty overrides any .env value and selects the in-memory stores
            .env("DATABASE_URL", "")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

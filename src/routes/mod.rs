//! Route table.
//!
//! Every rule names its access policy; there is no implicit default. Rules are
//! kept in registration order and a repeated `(method, path)` keeps the first.

use axum::{
    handler::Handler,
    http::Method,
    middleware,
    routing::{get, post, MethodRouter},
    Router,
};
use std::fmt;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::handlers::{gated, protected, public, webhooks};
use crate::middleware::{require_session_token, verify_active_shop, verify_webhook};
use crate::state::AppState;

/// Access policy attached to a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reachable without any shop context; the reason is logged at startup
    Public(&'static str),
    /// Active-shop gate: unknown shops are redirected to `/auth`
    ShopGate,
    /// Embedded-app session token plus stored shop credentials
    SessionToken,
    /// HMAC-signed webhook delivery
    Webhook,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public(_) => write!(f, "public"),
            Access::ShopGate => write!(f, "shop-gate"),
            Access::SessionToken => write!(f, "session-token"),
            Access::Webhook => write!(f, "webhook"),
        }
    }
}

pub struct RouteRule {
    pub method: Method,
    pub path: &'static str,
    pub access: Access,
    route: MethodRouter<AppState>,
}

#[derive(Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::GET, path, access, get(handler))
    }

    pub fn post<H, T>(self, path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.add(Method::POST, path, access, post(handler))
    }

    fn add(
        mut self,
        method: Method,
        path: &'static str,
        access: Access,
        route: MethodRouter<AppState>,
    ) -> Self {
        if let Some(existing) = self
            .rules
            .iter()
            .find(|rule| rule.method == method && rule.path == path)
        {
            tracing::warn!(
                method = %method,
                path,
                kept = %existing.access,
                ignored = %access,
                "Duplicate route ignored"
            );
            return self;
        }
        self.rules.push(RouteRule {
            method,
            path,
            access,
            route,
        });
        self
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Build the router. Requests matching no rule try the public directory,
    /// then fall through to gated page rendering.
    pub fn into_router(self, state: AppState) -> Router {
        let mut router = Router::new();

        for rule in self.rules {
            match rule.access {
                Access::Public(reason) => {
                    tracing::info!(method = %rule.method, path = rule.path, reason, "Public route")
                }
                access => {
                    tracing::info!(method = %rule.method, path = rule.path, access = %access, "Route")
                }
            }
            let route = guard(rule.route, rule.access, &state);
            router = router.route(rule.path, route);
        }

        let config = &state.config.server;
        let handshakes = state.handshakes.layer(state.config.security.secure_cookies);
        let pages: MethodRouter =
            guard(get(gated::render_page), Access::ShopGate, &state).with_state(state.clone());
        let public_dir = ServeDir::new(&config.static_dir)
            .call_fallback_on_method_not_allowed(true)
            .fallback(pages);

        router
            .nest_service("/_next/static", ServeDir::new(&config.next_static_dir))
            .fallback_service(public_dir)
            .layer(handshakes)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

fn guard(route: MethodRouter<AppState>, access: Access, state: &AppState) -> MethodRouter<AppState> {
    match access {
        Access::Public(_) => route,
        Access::ShopGate => {
            route.route_layer(middleware::from_fn_with_state(state.clone(), verify_active_shop))
        }
        Access::SessionToken => {
            route.route_layer(middleware::from_fn_with_state(state.clone(), require_session_token))
        }
        Access::Webhook => {
            route.route_layer(middleware::from_fn_with_state(state.clone(), verify_webhook))
        }
    }
}

/// The application's route table
pub fn route_table() -> RouteTable {
    RouteTable::new()
        .get("/health", Access::Public("liveness check"), public::health)
        .get("/auth", Access::Public("starts the OAuth handshake"), public::auth_begin)
        .get(
            "/auth/callback",
            Access::Public("OAuth redirect target, HMAC-verified"),
            public::auth_callback,
        )
        .get("/", Access::ShopGate, gated::render_page)
        .get(
            "/api/get-order",
            Access::Public("legacy order lookup against the configured shop"),
            public::get_order,
        )
        .get(
            "/api/customers/:id/metafields",
            Access::SessionToken,
            protected::customer_metafields,
        )
        .post("/webhooks", Access::Webhook, webhooks::app_webhook)
        .post("/webhooks/customers/redact", Access::Webhook, webhooks::customers_redact)
        .post("/webhooks/shop/redact", Access::Webhook, webhooks::shop_redact)
        .post(
            "/webhooks/customers/data_request",
            Access::Webhook,
            webhooks::customers_data_request,
        )
        .post("/graphql", Access::SessionToken, protected::graphql_proxy)
        .get(
            "/_next/webpack-hmr",
            Access::Public("front-end build tooling"),
            gated::render_page,
        )
}

pub fn app(state: AppState) -> Router {
    route_table().into_router(state)
}

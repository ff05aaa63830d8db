use serde::{Deserialize, Serialize};

use crate::config::ShopifyConfig;

/// Session key holding the [`PendingAuth`]
pub const PENDING_AUTH_KEY: &str = "pending_auth";

/// Minutes a pending handshake stays valid
pub const STATE_TTL_MINUTES: i64 = 10;

/// Fresh unguessable nonce for the `state` parameter
pub fn new_nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Platform URL that starts the offline-access OAuth grant for `shop`
pub fn authorization_url(config: &ShopifyConfig, shop: &str, nonce: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &config.api_key)
        .append_pair("scope", &config.scopes.join(","))
        .append_pair("redirect_uri", &config.redirect_uri())
        .append_pair("state", nonce)
        .finish();
    format!("https://{}/admin/oauth/authorize?{}", shop, query)
}

/// Handshake in flight, kept in the `/auth` session until the callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuth {
    pub shop: String,
    pub nonce: String,
}

impl PendingAuth {
    /// Whether a callback for `shop` carrying `state` completes this handshake
    pub fn matches(&self, shop: &str, state: &str) -> bool {
        self.shop == shop && self.nonce == state
    }
}

/// Application root the callback lands on, with `shop` and `host` attached
pub fn app_root_url(shop: &str, host: Option<&str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("shop", shop);
    if let Some(host) = host {
        query.append_pair("host", host);
    }
    format!("/?{}", query.finish())
}

/// Auth-initiation path for `shop`. `embedded` marks requests coming from
/// inside the admin iframe, which must escape to the top window first.
pub fn begin_auth_path(shop: &str, embedded: bool) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("shop", shop);
    if embedded {
        query.append_pair("embedded", "1");
    }
    format!("/auth?{}", query.finish())
}

/// Absolute auth-initiation URL on the app's public host
pub fn top_level_auth_url(config: &ShopifyConfig, shop: &str) -> String {
    format!("https://{}{}", config.host, begin_auth_path(shop, false))
}

/// Page served to framed `/auth` requests. The platform's consent screen
/// refuses to render inside the admin iframe, so the top window navigates
/// to `target` and starts the handshake from there.
pub fn top_level_redirect_page(target: &str) -> String {
    let literal = serde_json::to_string(target)
        .unwrap_or_else(|_| "\"/\"".to_string())
        .replace('<', "\\u003c");
    let href = target
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;");
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Redirecting</title>
  </head>
  <body>
    <script>
      var target = {literal};
      if (window.top === window.self) {{
        window.location.href = target;
      }} else {{
        window.top.location.href = target;
      }}
    </script>
    <noscript><a href="{href}" target="_top">Continue to installation</a></noscript>
  </body>
</html>
"#
    )
}

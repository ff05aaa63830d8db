use async_trait::async_trait;
use axum::body::Bytes;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Duration;

use super::platform::{AccessGrant, Platform, ProxiedResponse, UpstreamError};
use crate::config::{ShopifyConfig, UpstreamConfig};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// HTTP client for the commerce platform's OAuth, Admin REST and GraphQL APIs
pub struct ShopifyClient {
    http: reqwest::Client,
    api_key: String,
    api_secret: SecretString,
    api_version: String,
    shop: Option<String>,
    admin_token: SecretString,
    max_retries: u32,
    retry_backoff: Duration,
    origin: Option<String>,
}

impl ShopifyClient {
    pub fn new(shopify: &ShopifyConfig, upstream: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(upstream.timeout_secs))
            .user_agent(concat!("shop-gate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Network {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_key: shopify.api_key.clone(),
            api_secret: shopify.api_secret.clone(),
            api_version: shopify.api_version.clone(),
            shop: shopify.shop.clone(),
            admin_token: shopify.admin_token.clone(),
            max_retries: upstream.max_retries,
            retry_backoff: Duration::from_millis(upstream.retry_backoff_ms),
            origin: None,
        })
    }

    /// Send every request to `origin` instead of `https://{shop}`
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    fn base_url(&self, shop: &str) -> String {
        match &self.origin {
            Some(origin) => origin.trim_end_matches('/').to_string(),
            None => format!("https://{}", shop),
        }
    }

    fn target_shop(&self) -> Result<&str, UpstreamError> {
        self.shop.as_deref().ok_or(UpstreamError::NotConfigured("SHOP"))
    }

    fn admin_url(&self, shop: &str, path: &str) -> String {
        format!("{}/admin/api/{}/{}", self.base_url(shop), self.api_version, path)
    }

    /// GET with the static admin token, retrying transient failures
    async fn get_json(&self, url: &str) -> Result<Value, UpstreamError> {
        let mut attempt = 0;
        loop {
            match self.get_json_once(url).await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "Retrying {} after: {}", url, err);
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                result => return result,
            }
        }
    }

    async fn get_json_once(&self, url: &str) -> Result<Value, UpstreamError> {
        let response = self
            .http
            .get(url)
            .header(ACCESS_TOKEN_HEADER, self.admin_token.expose_secret())
            .send()
            .await
            .map_err(|e| send_error(url, e))?;

        let response = check_status(url, response).await?;
        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(url.to_string())
            } else {
                UpstreamError::Decode {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}

#[async_trait]
impl Platform for ShopifyClient {
    async fn exchange_code(&self, shop: &str, code: &str) -> Result<AccessGrant, UpstreamError> {
        let url = format!("{}/admin/oauth/access_token", self.base_url(shop));
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "client_id": self.api_key,
                "client_secret": self.api_secret.expose_secret(),
                "code": code,
            }))
            .send()
            .await
            .map_err(|e| send_error(&url, e))?;

        let response = check_status(&url, response).await?;
        response
            .json::<AccessGrant>()
            .await
            .map_err(|e| UpstreamError::Decode {
                url,
                message: e.to_string(),
            })
    }

    async fn graphql(
        &self,
        shop: &str,
        access_token: &str,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<ProxiedResponse, UpstreamError> {
        let url = self.admin_url(shop, "graphql.json");
        let response = self
            .http
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                content_type.unwrap_or("application/json"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| send_error(&url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| send_error(&url, e))?;

        Ok(ProxiedResponse {
            status,
            content_type,
            body,
        })
    }

    async fn get_order(&self, order_id: &str) -> Result<Value, UpstreamError> {
        let shop = self.target_shop()?;
        let url = self.admin_url(shop, &format!("orders/{}.json", order_id));
        self.get_json(&url).await
    }

    async fn get_customer_metafields(&self, customer_id: &str) -> Result<Value, UpstreamError> {
        let shop = self.target_shop()?;
        let url = self.admin_url(shop, &format!("customers/{}/metafields.json", customer_id));
        self.get_json(&url).await
    }
}

fn send_error(url: &str, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(url.to_string())
    } else {
        UpstreamError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body,
    })
}

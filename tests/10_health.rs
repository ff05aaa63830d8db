mod common;

use anyhow::Result;
use axum::http::StatusCode;

use common::TestApp;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["store"], "memory");
    Ok(())
}

#[tokio::test]
async fn spawned_server_redirects_unknown_shop() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let res = client
        .get(format!("{}/?shop=nobody.myshopify.com", server.base_url))
        .send()
        .await?;

    assert!(res.status().is_redirection());
    assert_eq!(
        res.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/auth?shop=nobody.myshopify.com")
    );
    Ok(())
}

#[tokio::test]
async fn health_reports_store_outage() -> Result<()> {
    let app = TestApp::with_token_store(std::sync::Arc::new(common::FailingTokenStore));
    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = common::body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "degraded");
    Ok(())
}

#[tokio::test]
async fn public_directory_needs_no_shop_context() -> Result<()> {
    let app = TestApp::new();
    let response = app.get("/robots.txt").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_text(response).await, "User-agent: *");
    Ok(())
}

#[tokio::test]
async fn next_static_assets_need_no_shop_context() -> Result<()> {
    let app = TestApp::new();
    let response = app.get("/_next/static/chunk.js").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_text(response).await, "console.log(1)");
    Ok(())
}

#[tokio::test]
async fn build_tooling_route_is_not_gated() -> Result<()> {
    let app = TestApp::new();
    let response = app.get("/_next/webpack-hmr").await;

    // No page for it in the fixture build, but no redirect either
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

mod common;

use anyhow::Result;
use axum::http::StatusCode;

use common::{TestApp, SHOP};

#[tokio::test]
async fn unknown_shop_is_sent_to_auth() -> Result<()> {
    let app = TestApp::new();
    let response = app.get("/?shop=unknown-store.myshopify.com").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        common::location(&response),
        "/auth?shop=unknown-store.myshopify.com"
    );
    Ok(())
}

#[tokio::test]
async fn fallback_pages_are_gated_too() -> Result<()> {
    let app = TestApp::new();
    let response = app.get("/orders?shop=unknown-store.myshopify.com").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        common::location(&response),
        "/auth?shop=unknown-store.myshopify.com"
    );
    Ok(())
}

#[tokio::test]
async fn missing_or_invalid_shop_is_rejected() -> Result<()> {
    let app = TestApp::new();

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/?shop=evil.example.com").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn installed_shop_gets_the_page() -> Result<()> {
    let app = TestApp::new();
    app.install_shop(SHOP, "shpat_1").await;

    let response = app.get(&format!("/?shop={}&host=abc", SHOP)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_text(response).await, "<h1>app home</h1>");

    // The store lookup warmed the cache
    assert!(app.state.active_shops.contains(SHOP));

    let response = app.get(&format!("/orders?shop={}", SHOP)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_text(response).await, "<h1>orders</h1>");
    Ok(())
}

#[tokio::test]
async fn record_without_offline_session_is_not_enough() -> Result<()> {
    let app = TestApp::new();
    app.state
        .tokens
        .upsert_shop(&shop_gate::database::Shop::new(SHOP, "shpat_1", "read_orders"))
        .await?;

    let response = app.get(&format!("/?shop={}", SHOP)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn gate_can_be_switched_off() -> Result<()> {
    let app = TestApp::configured(|config| config.security.enforce_shop_verification = false);

    let response = app.get("/?shop=unknown-store.myshopify.com").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn uninstall_evicts_cached_shop() -> Result<()> {
    let app = TestApp::new();
    app.install_shop(SHOP, "shpat_1").await;
    assert_eq!(app.get(&format!("/?shop={}", SHOP)).await.status(), StatusCode::OK);

    let response = app
        .send(common::webhook_request(
            "/webhooks",
            "app/uninstalled",
            SHOP,
            r#"{"id":1}"#,
            common::API_SECRET,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get(&format!("/?shop={}", SHOP)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    Ok(())
}

//! Cart and catalog tests against the full router.

use axum::http::StatusCode;
use cartwright_integration_tests::TestApp;

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let mut client = app.client();

    let response = client.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers.contains_key("x-request-id"));

    let response = client.get("/health/ready").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_listing_and_filter() {
    let app = TestApp::new();
    let mut client = app.client();

    let all = client.get("/products").await.json();
    assert_eq!(all.as_array().map(Vec::len), Some(3));

    let watches = client.get("/products?category=Watches").await.json();
    assert_eq!(watches[0]["id"], "prod_001");
    assert_eq!(watches.as_array().map(Vec::len), Some(1));

    let categories = client.get("/products/categories").await.json();
    assert_eq!(
        categories,
        serde_json::json!(["Accessories", "Bags", "Watches"])
    );

    let response = client.get("/products/prod_404").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_then_zero_quantity_empties_cart() {
    let app = TestApp::new();
    let mut client = app.client();

    let cart = client.add_to_cart("prod_003", 2).await;
    assert_eq!(cart["count"], 2);
    assert_eq!(cart["total"], "71.00");

    let response = client
        .post_form(
            "/cart/update",
            &[("product_id", "prod_003"), ("quantity", "0")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let cart = response.json();
    assert_eq!(cart["count"], 0);
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_cart_persists_across_requests() {
    let app = TestApp::new();
    let mut client = app.client();

    client.add_to_cart("prod_001", 1).await;
    client.add_to_cart("prod_002", 1).await;
    client.add_to_cart("prod_001", 1).await;

    let cart = client.get("/cart").await.json();
    assert_eq!(cart["items"][0]["product_id"], "prod_001");
    assert_eq!(cart["items"][0]["quantity"], 2);
    assert_eq!(cart["items"][1]["product_id"], "prod_002");
    assert_eq!(cart["total"], "1020.00");

    let count = client.get("/cart/count").await.json();
    assert_eq!(count["count"], 3);
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let app = TestApp::new();
    let mut client = app.client();
    client.add_to_cart("prod_002", 1).await;

    for _ in 0..2 {
        let response = client
            .post_form("/cart/remove", &[("product_id", "prod_002")])
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["count"], 0);
    }
}

#[tokio::test]
async fn test_unknown_product_is_not_added() {
    let app = TestApp::new();
    let mut client = app.client();

    let response = client
        .post_form("/cart/add", &[("product_id", "prod_404")])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let cart = client.get("/cart").await.json();
    assert_eq!(cart["count"], 0);
}

#[tokio::test]
async fn test_carts_are_per_visitor() {
    let app = TestApp::new();
    let mut alice = app.client();
    let mut bob = app.client();

    alice.add_to_cart("prod_001", 1).await;

    assert_eq!(bob.get("/cart/count").await.json()["count"], 0);
    assert_eq!(alice.get("/cart/count").await.json()["count"], 1);
}

#[tokio::test]
async fn test_clear_cart() {
    let app = TestApp::new();
    let mut client = app.client();
    client.add_to_cart("prod_001", 3).await;

    let response = client.post_form("/cart/clear", &[]).await;
    assert_eq!(response.json()["count"], 0);
    assert_eq!(client.get("/cart").await.json()["total"], "0.00");
}

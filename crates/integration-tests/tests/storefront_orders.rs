//! Auth and order history tests against the full router.

use axum::http::StatusCode;
use cartwright_integration_tests::{PASSWORD, TestApp};

async fn place_order(client: &mut cartwright_integration_tests::TestClient) -> String {
    client.add_to_cart("prod_003", 1).await;
    client.submit_shipping().await;
    client.submit_payment().await;
    let response = client.post_form("/checkout/place-order", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    response
        .location()
        .and_then(|l| l.strip_prefix("/order-confirmation/"))
        .map(str::to_owned)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_register_login_logout() {
    let app = TestApp::new();
    let mut client = app.client();

    let registered = client.register("Jane@Example.com").await;
    assert_eq!(registered["user"]["email"], "jane@example.com");

    let me = client.get("/auth/me").await;
    assert_eq!(me.status, StatusCode::OK);

    let response = client.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(client.get("/auth/me").await.status, StatusCode::UNAUTHORIZED);

    let response = client
        .post_form(
            "/auth/login",
            &[("email", "jane@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["user"]["email"], "jane@example.com");
}

#[tokio::test]
async fn test_bad_credentials_and_duplicates() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("dup@example.com").await;

    let response = client
        .post_form(
            "/auth/register",
            &[
                ("email", "dup@example.com"),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = client
        .post_form(
            "/auth/login",
            &[("email", "dup@example.com"), ("password", "wrong-password")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_keeps_cart() {
    let app = TestApp::new();
    let mut setup = app.client();
    setup.register("keeper@example.com").await;

    let mut client = app.client();
    client.add_to_cart("prod_001", 1).await;
    let response = client
        .post_form(
            "/auth/login",
            &[("email", "keeper@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(client.get("/cart/count").await.json()["count"], 1);
}

#[tokio::test]
async fn test_orders_are_private_to_owner() {
    let app = TestApp::new();
    let mut alice = app.client();
    let mut bob = app.client();
    alice.register("alice@example.com").await;
    bob.register("bob@example.com").await;

    let order_id = place_order(&mut alice).await;
    assert!(!order_id.is_empty());

    let response = alice.get(&format!("/orders/{order_id}")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["id"], order_id.as_str());

    let response = bob.get(&format!("/orders/{order_id}")).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/orders"));

    let response = bob.get(&format!("/order-confirmation/{order_id}")).await;
    assert_eq!(response.location(), Some("/orders"));

    assert_eq!(bob.get("/orders").await.json().as_array().map(Vec::len), Some(0));

    let response = alice.get("/orders/order_missing").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_history_is_newest_first() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("history@example.com").await;

    let first = place_order(&mut client).await;
    let second = place_order(&mut client).await;

    let orders = client.get("/orders").await.json();
    assert_eq!(orders[0]["id"], second.as_str());
    assert_eq!(orders[1]["id"], first.as_str());
}

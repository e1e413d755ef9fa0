//! Forgot-password and reset-password tests against the full router.

use axum::http::StatusCode;
use cartwright_integration_tests::{PASSWORD, TestApp};
use cartwright_storefront::services::AuthService;

const NEW_PASSWORD: &str = "staple-battery-horse";

/// Register `email` and issue a reset token for it, bypassing the log.
async fn issue_token(app: &TestApp, email: &str) -> String {
    app.client().register(email).await;
    AuthService::new(app.store.as_ref())
        .request_password_reset(email)
        .await
        .expect("reset request succeeds")
        .expect("account exists")
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let app = TestApp::new();
    let mut client = app.client();
    client.register("known@example.com").await;

    let known = client
        .post_form("/auth/forgot-password", &[("email", "known@example.com")])
        .await;
    assert_eq!(known.status, StatusCode::ACCEPTED);
    assert_eq!(app.store.pending_reset_count().await, 1);

    let unknown = client
        .post_form("/auth/forgot-password", &[("email", "ghost@example.com")])
        .await;
    assert_eq!(unknown.status, StatusCode::ACCEPTED);
    assert_eq!(unknown.body, known.body);
    assert_eq!(app.store.pending_reset_count().await, 1);

    let invalid = client
        .post_form("/auth/forgot-password", &[("email", "not-an-email")])
        .await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reset_password_replaces_password_once() {
    let app = TestApp::new();
    let token = issue_token(&app, "jane@example.com").await;
    let mut client = app.client();

    let response = client
        .post_form(
            "/auth/reset-password",
            &[
                ("token", token.as_str()),
                ("password", NEW_PASSWORD),
                ("password_confirm", NEW_PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let old = client
        .post_form(
            "/auth/login",
            &[("email", "jane@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = client
        .post_form(
            "/auth/login",
            &[("email", "jane@example.com"), ("password", NEW_PASSWORD)],
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);

    let reused = client
        .post_form(
            "/auth/reset-password",
            &[
                ("token", token.as_str()),
                ("password", "another-password"),
                ("password_confirm", "another-password"),
            ],
        )
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reused.json()["error"],
        "This reset link is invalid or has expired"
    );
}

#[tokio::test]
async fn test_rejected_reset_keeps_token_usable() {
    let app = TestApp::new();
    let token = issue_token(&app, "sam@example.com").await;
    let mut client = app.client();

    let mismatch = client
        .post_form(
            "/auth/reset-password",
            &[
                ("token", token.as_str()),
                ("password", NEW_PASSWORD),
                ("password_confirm", "something-else"),
            ],
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::UNPROCESSABLE_ENTITY);

    let forged = client
        .post_form(
            "/auth/reset-password",
            &[
                ("token", "0123456789abcdef0123456789abcdef"),
                ("password", NEW_PASSWORD),
                ("password_confirm", NEW_PASSWORD),
            ],
        )
        .await;
    assert_eq!(forged.status, StatusCode::BAD_REQUEST);

    let response = client
        .post_form(
            "/auth/reset-password",
            &[
                ("token", token.as_str()),
                ("password", NEW_PASSWORD),
                ("password_confirm", NEW_PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

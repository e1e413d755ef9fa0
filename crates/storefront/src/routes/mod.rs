//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (product store)
//!
//! # Products
//! GET  /products                   - Product listing (?category=)
//! GET  /products/categories        - Distinct categories
//! GET  /products/{id}              - Product detail
//!
//! # Cart (session backed)
//! GET  /cart                       - Cart contents and totals
//! POST /cart/add                   - Add a product
//! POST /cart/update                - Set a line's quantity (0 removes)
//! POST /cart/remove                - Remove a line
//! POST /cart/clear                 - Empty the cart
//! GET  /cart/count                 - Cart count badge
//!
//! # Checkout (requires auth)
//! GET  /checkout                   - Redirect to the current step
//! GET  /checkout/shipping          - Shipping step
//! POST /checkout/shipping          - Save shipping address
//! GET  /checkout/payment           - Payment step
//! POST /checkout/payment           - Save payment details
//! GET  /checkout/summary           - Order summary
//! POST /checkout/place-order       - Place the order
//!
//! # Orders (requires auth)
//! GET  /orders                     - Order history
//! GET  /orders/{id}                - Order detail
//! GET  /order-confirmation/{id}    - Receipt
//!
//! # Auth
//! GET  /auth/login                 - Login page data
//! POST /auth/login                 - Login action
//! POST /auth/register              - Register action
//! POST /auth/logout                - Logout action
//! POST /auth/forgot-password       - Issue a reset link
//! POST /auth/reset-password        - Set a new password from a reset link
//! GET  /auth/me                    - Current user
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::middleware::{api_rate_limiter, auth_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/me", get(auth::me))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/categories", get(products::categories))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
        .layer(api_rate_limiter())
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::start))
        .route(
            "/shipping",
            get(checkout::shipping).post(checkout::submit_shipping),
        )
        .route(
            "/payment",
            get(checkout::payment).post(checkout::submit_payment),
        )
        .route("/summary", get(checkout::summary))
        .route("/place-order", post(checkout::place_order))
        .layer(api_rate_limiter())
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .route("/order-confirmation/{id}", get(orders::confirmation))
        .nest("/auth", auth_routes())
}

/// Build the complete application: routes, session, request id and tracing.
///
/// Sentry layers are added by the binary so tests can run without a client.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the product store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.catalog().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

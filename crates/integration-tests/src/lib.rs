//! Integration tests for Cartwright.
//!
//! The tests drive the full storefront router (sessions, rate limits,
//! request ids) in process with `tower::ServiceExt::oneshot`. Products,
//! orders and users live in the in-memory store and sessions in
//! `tower_sessions::MemoryStore`, so no database is needed.
//!
//! ```bash
//! cargo test -p cartwright-integration-tests
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use secrecy::SecretString;
use tower::ServiceExt;
use url::Url;

use cartwright_core::{Price, Product, ProductId};
use cartwright_storefront::config::{SentryConfig, StorefrontConfig};
use cartwright_storefront::db::MemoryStore;
use cartwright_storefront::middleware::session::{SESSION_COOKIE_NAME, session_layer};
use cartwright_storefront::routes;
use cartwright_storefront::state::{AppState, Stores};

/// Password used by every test account.
pub const PASSWORD: &str = "correct-horse-battery";

/// Each client gets its own address so rate limits do not leak between them.
static NEXT_CLIENT: AtomicU32 = AtomicU32::new(1);

/// The catalog every test starts with.
#[must_use]
pub fn demo_products() -> Vec<Product> {
    vec![
        product("prod_001", "Chronograph Excellence", 45000, "Watches"),
        product("prod_002", "Leather Weekender", 12000, "Bags"),
        product("prod_003", "Silk Scarf", 3550, "Accessories"),
    ]
}

fn product(id: &str, name: &str, cents: i64, category: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: format!("{name} from the demo catalog"),
        price: Price::from_cents(cents),
        images: vec![format!("https://images.example.com/{id}.jpg")],
        category: category.to_string(),
        stock: 10,
        image_hint: None,
    }
}

fn config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/cartwright_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: Url::parse("http://localhost:3000").expect("static URL parses"),
        sentry: SentryConfig::default(),
    }
}

/// A storefront wired to in-memory stores.
pub struct TestApp {
    router: Router,
    /// The product/order/user store behind the router.
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Build an app seeded with [`demo_products`].
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::with_products(demo_products()));
        let state = AppState::new(config(), Stores::memory(store.clone()));
        let sessions = session_layer(tower_sessions::MemoryStore::default(), false);

        Self {
            router: routes::app(state, sessions),
            store,
        }
    }

    /// A fresh visitor with no session.
    #[must_use]
    pub fn client(&self) -> TestClient {
        let n = NEXT_CLIENT.fetch_add(1, Ordering::Relaxed);
        let [_, _, hi, lo] = n.to_be_bytes();
        TestClient {
            router: self.router.clone(),
            cookie: None,
            ip: format!("10.0.{hi}.{lo}"),
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A visitor with a cookie jar holding the session cookie.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
    ip: String,
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Parse the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    /// The redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

impl TestClient {
    /// Send a GET request.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Request::get(path), Body::empty()).await
    }

    /// Send a GET request that only accepts JSON.
    pub async fn get_json(&mut self, path: &str) -> TestResponse {
        let builder = Request::get(path).header(header::ACCEPT, "application/json");
        self.send(builder, Body::empty()).await
    }

    /// Send a form-encoded POST request.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let builder = Request::post(path).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        self.send(builder, Body::from(body)).await
    }

    /// Register and sign in a new account.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn register(&mut self, email: &str) -> serde_json::Value {
        let response = self
            .post_form(
                "/auth/register",
                &[
                    ("email", email),
                    ("password", PASSWORD),
                    ("password_confirm", PASSWORD),
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "register {email}");
        response.json()
    }

    /// Put `quantity` of a product in the cart.
    ///
    /// # Panics
    ///
    /// Panics if the product cannot be added.
    pub async fn add_to_cart(&mut self, product_id: &str, quantity: u32) -> serde_json::Value {
        let quantity = quantity.to_string();
        let response = self
            .post_form(
                "/cart/add",
                &[("product_id", product_id), ("quantity", &quantity)],
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "add {product_id}");
        response.json()
    }

    /// Submit a valid shipping address.
    pub async fn submit_shipping(&mut self) -> TestResponse {
        self.post_form(
            "/checkout/shipping",
            &[
                ("name", "Jane Doe"),
                ("line1", "123 Main Street"),
                ("line2", ""),
                ("city", "New York"),
                ("state", "NY"),
                ("postal_code", "10001"),
                ("country", "United States"),
            ],
        )
        .await
    }

    /// Submit valid card details.
    pub async fn submit_payment(&mut self) -> TestResponse {
        self.post_form(
            "/checkout/payment",
            &[
                ("card_name", "Jane Doe"),
                ("card_number", "4242 4242 4242 4242"),
                ("expiry_date", "12/30"),
                ("cvc", "123"),
            ],
        )
        .await
    }

    async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let mut builder = builder.header("x-forwarded-for", &self.ip);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(body).expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        self.store_cookie(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    fn store_cookie(&mut self, headers: &HeaderMap) {
        let prefix = format!("{SESSION_COOKIE_NAME}=");
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let Some(pair) = value.split(';').next() else {
                continue;
            };
            if let Some(id) = pair.strip_prefix(&prefix) {
                self.cookie = (!id.is_empty()).then(|| pair.to_string());
            }
        }
    }
}

//! Document store access for the storefront.
//!
//! # Stores
//!
//! Handlers never talk to `PostgreSQL` directly. They go through three
//! narrow traits, held as trait objects in [`AppState`](crate::state::AppState):
//!
//! - [`ProductStore`] - read-only catalog queries
//! - [`OrderStore`] - create one order, read by id, list by user
//! - [`UserStore`] - account records for password login and reset
//!
//! `PostgreSQL` implementations live in [`products`], [`orders`] and
//! [`users`]; [`memory::MemoryStore`] implements all three for tests and
//! local demos.
//!
//! # Tables (schema `storefront`)
//!
//! - `product` - Catalog documents
//! - `order` - Order documents (items, shipping and payment as JSONB)
//! - `user` - Site accounts with Argon2 password hashes
//! - `password_reset` - Hashed single-use reset tokens
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p cartwright-cli -- migrate run
//! ```

pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use cartwright_core::{Email, NewOrder, Order, OrderId, Product, ProductId, UserId};

pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

use crate::models::user::User;

/// Errors returned by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached or refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only catalog queries.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, or only those whose category equals `category`.
    async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError>;

    async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Distinct categories in ascending order.
    async fn categories(&self) -> Result<Vec<String>, RepositoryError>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Order documents.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Write one order. The store assigns the id and creation time.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// A user's orders, newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError>;
}

/// Site accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account.
    ///
    /// Returns [`RepositoryError::Conflict`] when the email is taken.
    async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError>;

    /// Look up an account and its password hash by email.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    /// Store a reset token hash for `user_id`.
    ///
    /// Any unused token the user already had is discarded, so only the most
    /// recent link works.
    async fn create_reset_token(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Mark a reset token used and replace the owner's password hash.
    ///
    /// Both happen together or not at all. Returns `None` when the token is
    /// unknown, already used, or expired at `now`.
    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-violation into [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

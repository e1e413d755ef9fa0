//! In-memory document store.
//!
//! Implements [`ProductStore`], [`OrderStore`] and [`UserStore`] over plain
//! collections behind `tokio` locks. Used by the test suites and for running
//! the storefront without a database. Writes can be made to fail on demand
//! to exercise the "backend unavailable" paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use cartwright_core::{Email, NewOrder, Order, OrderId, Product, ProductId, UserId};

use super::{OrderStore, ProductStore, RepositoryError, UserStore};
use crate::models::user::User;

struct ResetRecord {
    token_hash: String,
    user_id: UserId,
    expires_at: DateTime<Utc>,
    used: bool,
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
    orders: RwLock<Vec<Order>>,
    users: RwLock<Vec<(User, String)>>,
    resets: RwLock<Vec<ResetRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with a catalog.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            products: RwLock::new(catalog),
            ..Self::default()
        }
    }

    /// Add or replace a catalog product.
    pub async fn put_product(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    /// Make every subsequent write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of orders written so far.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Number of reset tokens that are neither used nor replaced.
    pub async fn pending_reset_count(&self) -> usize {
        self.resets.read().await.iter().filter(|r| !r.used).count()
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "memory store is rejecting writes".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let products = self.products.read().await;
        let mut categories: Vec<String> = products.values().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.check_writable()?;
        let order = order.into_order(OrderId::generate(), Utc::now());
        self.orders.write().await.push(order.clone());
        Ok(order)
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|o| &o.id == id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        // Newest insert first, then a stable sort keeps that order for equal timestamps.
        let mut mine: Vec<Order> = orders
            .iter()
            .rev()
            .filter(|o| o.is_owned_by(user_id))
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        if users.iter().any(|(u, _)| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let user = User {
            id: UserId::generate(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        users.push((user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|(u, _)| &u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn create_reset_token(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut resets = self.resets.write().await;
        resets.retain(|r| r.used || &r.user_id != user_id);
        resets.push(ResetRecord {
            token_hash: token_hash.to_owned(),
            user_id: user_id.clone(),
            expires_at,
            used: false,
        });
        Ok(())
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        self.check_writable()?;
        let mut resets = self.resets.write().await;
        let Some(record) = resets
            .iter_mut()
            .find(|r| r.token_hash == token_hash && !r.used && r.expires_at > now)
        else {
            return Ok(None);
        };

        let mut users = self.users.write().await;
        let Some((user, hash)) = users.iter_mut().find(|(u, _)| u.id == record.user_id) else {
            return Ok(None);
        };
        record.used = true;
        password_hash.clone_into(hash);
        Ok(Some(user.clone()))
    }
}

//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{
    MemoryStore, OrderRepository, OrderStore, ProductRepository, ProductStore, UserRepository,
    UserStore,
};
use crate::services::Catalog;

/// The document stores the storefront reads and writes.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            products: Arc::new(ProductRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
        }
    }

    /// All three stores backed by one [`MemoryStore`].
    #[must_use]
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            products: store.clone(),
            orders: store.clone(),
            users: store,
        }
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    orders: Arc<dyn OrderStore>,
    users: Arc<dyn UserStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, stores: Stores) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog: Catalog::new(stores.products),
                orders: stores.orders,
                users: stores.users,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the cached product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get the order store.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Get the user store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }
}

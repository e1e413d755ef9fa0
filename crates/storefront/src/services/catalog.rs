//! Catalog reads with an in-process cache.
//!
//! Products are read-only for the storefront, so list, detail and category
//! queries are cached using `moka` (5-minute TTL).

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use cartwright_core::{Product, ProductId};

use crate::db::{ProductStore, RepositoryError};

/// Cache key for catalog queries.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Products { category: Option<String> },
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<String>>),
}

/// Cached front for a [`ProductStore`].
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn ProductStore>,
    cache: Cache<CacheKey, CacheValue>,
}

impl Catalog {
    #[must_use]
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self { store, cache }
    }

    /// Get a product by id. Misses are not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let product = self.store.get(id).await?;
        if let Some(product) = &product {
            self.cache
                .insert(key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }
        Ok(product)
    }

    /// List products, optionally only those in `category`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    #[instrument(skip(self))]
    pub async fn products(&self, category: Option<&str>) -> Result<Arc<Vec<Product>>, RepositoryError> {
        let key = CacheKey::Products {
            category: category.map(str::to_owned),
        };
        if let Some(CacheValue::Products(products)) = self.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products = Arc::new(self.store.list(category).await?);
        self.cache
            .insert(key, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// Distinct product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<String>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(self.store.categories().await?);
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Readiness check against the underlying store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.store.ping().await
    }
}

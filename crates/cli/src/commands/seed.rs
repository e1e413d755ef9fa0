//! Catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Load the bundled demo catalog
//! cw-cli seed products
//!
//! # Load a catalog from a JSON file instead
//! cw-cli seed products --file catalog.json
//! ```
//!
//! The file is a JSON array of products in the same shape the storefront
//! serves them (`price` as a decimal string). Products are upserted by id,
//! so seeding is safe to repeat and never removes products.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use cartwright_core::Product;
use cartwright_storefront::db::{ProductRepository, RepositoryError};

use super::migrate::{self, MigrationError};

/// The demo catalog shipped with the CLI.
const DEMO_CATALOG: &str = include_str!("../../data/demo_products.json");

/// Errors raised while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] MigrationError),

    #[error("Could not read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid catalog: {0}")]
    Invalid(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Upsert the demo catalog, or the catalog in `file`, into `storefront.product`.
///
/// The catalog is parsed and checked before connecting to the database.
///
/// # Errors
///
/// Returns an error if the catalog is unreadable or invalid, the database
/// is unreachable, or a write fails.
pub async fn products(file: Option<&Path>) -> Result<(), SeedError> {
    let catalog = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog from file");
            parse_catalog(&tokio::fs::read_to_string(path).await?)?
        }
        None => {
            info!("Loading demo catalog");
            parse_catalog(DEMO_CATALOG)?
        }
    };

    let pool = migrate::connect().await?;
    let written = ProductRepository::new(pool).upsert(&catalog).await?;

    info!(products = catalog.len(), written, "Catalog seeded");
    Ok(())
}

/// Parse and check a JSON catalog.
fn parse_catalog(json: &str) -> Result<Vec<Product>, SeedError> {
    let catalog: Vec<Product> = serde_json::from_str(json)?;
    if catalog.is_empty() {
        return Err(SeedError::Invalid("catalog has no products".to_string()));
    }

    let mut seen = HashSet::new();
    for product in &catalog {
        if !seen.insert(product.id.as_str()) {
            return Err(SeedError::Invalid(format!("duplicate product id {}", product.id)));
        }
        if product.name.trim().is_empty() || product.category.trim().is_empty() {
            return Err(SeedError::Invalid(format!(
                "product {} needs a name and a category",
                product.id
            )));
        }
        if product.price.amount().is_sign_negative() {
            return Err(SeedError::Invalid(format!("product {} has a negative price", product.id)));
        }
    }
    Ok(catalog)
}

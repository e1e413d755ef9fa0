//! Product route handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use cartwright_core::{Product, ProductId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only products whose category equals this value.
    pub category: Option<String>,
}

/// List products, optionally filtered by category.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Arc<Vec<Product>>>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let products = state.catalog().products(category).await?;
    Ok(Json(products))
}

/// List distinct product categories.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Arc<Vec<String>>>> {
    Ok(Json(state.catalog().categories().await?))
}

/// Display a single product.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = ProductId::new(id);
    state
        .catalog()
        .product(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

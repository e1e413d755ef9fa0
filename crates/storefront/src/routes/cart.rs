//! Cart route handlers.
//!
//! Every mutation reads the cart from the session, applies the change, and
//! writes it back before responding with the updated cart.

use axum::{
    Form, Json,
    extract::State,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use cartwright_core::{CartLine, CartState, Price, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::cart;
use crate::state::AppState;

/// One cart line as shown to the visitor.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub price: Price,
    pub quantity: u32,
    pub line_total: Price,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id.clone(),
            name: line.product.name.clone(),
            image: line.product.primary_image().map(str::to_owned),
            price: line.product.price,
            quantity: line.quantity,
            line_total: line.line_total(),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub count: u32,
    pub total: Price,
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            count: cart.count(),
            total: cart.total(),
        }
    }
}

/// Cart badge data.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCount {
    pub count: u32,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    /// Defaults to 1 (the product card's quick add).
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Display the cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let cart = cart::load(&session).await?;
    Ok(Json(CartView::from(&cart)))
}

/// Add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<CartView>> {
    let id = ProductId::new(form.product_id);
    let product = state
        .catalog()
        .product(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let quantity = form.quantity.unwrap_or(1);

    let cart = cart::update(&session, |cart| cart.add(product, quantity)).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", id.as_str()), ("quantity", &quantity.to_string())]),
    );
    Ok(Json(CartView::from(&cart)))
}

/// Set a line's quantity; zero removes the line.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Json<CartView>> {
    let id = ProductId::new(form.product_id);
    let cart = cart::update(&session, |cart| cart.update_quantity(&id, form.quantity)).await?;
    Ok(Json(CartView::from(&cart)))
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Json<CartView>> {
    let id = ProductId::new(form.product_id);
    let cart = cart::update(&session, |cart| cart.remove(&id)).await?;
    Ok(Json(CartView::from(&cart)))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartView>> {
    cart::clear(&session).await?;
    Ok(Json(CartView::from(&CartState::new())))
}

/// Cart count badge.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<Json<CartCount>> {
    let cart = cart::load(&session).await?;
    Ok(Json(CartCount {
        count: cart.count(),
    }))
}

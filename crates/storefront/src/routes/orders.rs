//! Order history and confirmation handlers.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use cartwright_core::{Order, OrderId, OrderStatus, PaymentSummary, Price, ShippingAddress};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Where a visitor asking for someone else's order is sent.
const ORDERS_PATH: &str = "/orders";

/// One row of the order history list.
#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub item_count: u32,
    pub total: Price,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            created_at: order.created_at,
            status: order.status,
            item_count: order.item_count(),
            total: order.total,
        }
    }
}

/// Receipt shown once an order is placed.
#[derive(Debug, Serialize)]
pub struct ReceiptView {
    pub message: &'static str,
    pub order_id: OrderId,
    pub total: Price,
    pub item_count: u32,
    pub shipping_address: ShippingAddress,
    pub payment: PaymentSummary,
}

impl From<Order> for ReceiptView {
    fn from(order: Order) -> Self {
        Self {
            message: "Thank you for your order!",
            item_count: order.item_count(),
            order_id: order.id,
            total: order.total,
            shipping_address: order.shipping_address,
            payment: order.payment,
        }
    }
}

/// The signed-in user's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = state.orders().list_for_user(&user.id).await?;
    Ok(Json(orders.iter().map(OrderSummary::from).collect()))
}

/// Look up an order for its owner.
///
/// `Ok(None)` means the order exists but belongs to someone else.
async fn owned_order(state: &AppState, id: &OrderId, user: &RequireAuth) -> Result<Option<Order>> {
    let order = state
        .orders()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    if order.is_owned_by(&user.0.id) {
        Ok(Some(order))
    } else {
        tracing::warn!(order_id = %id, user_id = %user.0.id, "order requested by non-owner");
        Ok(None)
    }
}

/// Order detail page.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = OrderId::new(id);
    Ok(match owned_order(&state, &id, &auth).await? {
        Some(order) => Json(order).into_response(),
        None => Redirect::to(ORDERS_PATH).into_response(),
    })
}

/// Confirmation page shown right after an order is placed.
#[instrument(skip(state, auth))]
pub async fn confirmation(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = OrderId::new(id);
    Ok(match owned_order(&state, &id, &auth).await? {
        Some(order) => Json(ReceiptView::from(order)).into_response(),
        None => Redirect::to(ORDERS_PATH).into_response(),
    })
}

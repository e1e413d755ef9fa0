//! Order repository backed by `storefront.order`.
//!
//! Line items, the shipping address and the payment summary are stored as
//! JSONB snapshots so an order keeps showing what was bought even after the
//! catalog changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use cartwright_core::{
    CartLine, NewOrder, Order, OrderId, OrderStatus, PaymentSummary, Price, ShippingAddress,
    UserId,
};

use super::{OrderStore, RepositoryError};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<CartLine>>,
    total: Decimal,
    shipping_address: Json<ShippingAddress>,
    payment: Json<PaymentSummary>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            total: Price::new(row.total),
            shipping_address: row.shipping_address.0,
            payment: row.payment.0,
            status,
            created_at: row.created_at,
        })
    }
}

const ORDER_COLUMNS: &str =
    "id, user_id, items, total, shipping_address, payment, status, created_at";

/// Repository for order documents.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    #[instrument(skip(self, order), fields(user_id = %order.user_id, total = %order.total))]
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let id = OrderId::generate();

        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r"
            INSERT INTO storefront.order
                (id, user_id, items, total, shipping_address, payment, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING created_at
            ",
        )
        .bind(&id)
        .bind(&order.user_id)
        .bind(Json(&order.items))
        .bind(order.total.amount())
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.payment))
        .bind(order.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| super::conflict_on_unique(e, "order"))?;

        Ok(order.into_order(id, created_at))
    }

    #[instrument(skip(self, id), fields(order_id = %id))]
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    #[instrument(skip(self, user_id), fields(user_id = %user_id))]
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }
}

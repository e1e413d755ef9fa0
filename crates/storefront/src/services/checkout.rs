//! Checkout session persistence and order submission.
//!
//! Placing an order is one all-or-nothing write. The cart and checkout
//! session are cleared only after the store accepts the order; if the write
//! fails both stay exactly as they were so the visitor can resubmit.

use thiserror::Error;
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;
use tracing::instrument;

use cartwright_core::{CheckoutSession, NewOrder, Order, OrderError};

use crate::db::{OrderStore, RepositoryError};
use crate::models::{CurrentUser, session_keys};
use crate::services::cart;

/// Errors placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart or checkout session is incomplete.
    #[error(transparent)]
    Incomplete(#[from] OrderError),

    /// The order store rejected or could not take the write.
    #[error("order write failed: {0}")]
    Store(#[from] RepositoryError),

    /// Session storage failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Load the visitor's checkout session, or a fresh one.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<CheckoutSession, SessionError> {
    cart::get_or_default(session, session_keys::CHECKOUT).await
}

/// Persist the visitor's checkout session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save(session: &Session, checkout: &CheckoutSession) -> Result<(), SessionError> {
    session.insert(session_keys::CHECKOUT, checkout).await
}

/// Build and write the order for the visitor's cart and checkout session.
///
/// # Errors
///
/// Returns [`CheckoutError::Incomplete`] without writing when the cart is
/// empty or a step is missing, and [`CheckoutError::Store`] when the write
/// fails. In both cases the session is left untouched.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order(
    orders: &dyn OrderStore,
    session: &Session,
    user: &CurrentUser,
) -> Result<Order, CheckoutError> {
    let cart_state = cart::load(session).await?;
    let checkout = load(session).await?;

    let new_order = NewOrder::from_checkout(user.id.clone(), &cart_state, &checkout)?;
    let order = orders.create(new_order).await?;

    cart::clear(session).await?;
    session.remove::<CheckoutSession>(session_keys::CHECKOUT).await?;

    tracing::info!(order_id = %order.id, total = %order.total, "order placed");
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use cartwright_core::{
        OrderStatus, PaymentForm, Price, Product, ProductId, ShippingForm, UserId,
    };

    use super::*;
    use crate::db::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(tower_sessions::MemoryStore::default()), None)
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new("user_1"),
            email: cartwright_core::Email::parse("jane@example.com").unwrap(),
        }
    }

    async fn ready_session() -> Session {
        let session = session();
        cart::update(&session, |c| {
            c.add(
                Product {
                    id: ProductId::new("prod_001"),
                    name: "Chronograph Excellence".to_string(),
                    description: "A timepiece".to_string(),
                    price: Price::from_cents(45000),
                    images: Vec::new(),
                    category: "Watches".to_string(),
                    stock: 15,
                    image_hint: None,
                },
                1,
            );
        })
        .await
        .unwrap();

        let mut checkout = CheckoutSession::new();
        checkout
            .submit_shipping(&ShippingForm {
                name: "Jane Doe".to_string(),
                line1: "123 Main St".to_string(),
                line2: None,
                city: "New York".to_string(),
                state: "NY".to_string(),
                postal_code: "10001".to_string(),
                country: "United States".to_string(),
            })
            .unwrap();
        checkout
            .submit_payment(&PaymentForm {
                card_name: "Jane Doe".to_string(),
                card_number: "4242424242424242".to_string(),
                expiry_date: "12/30".to_string(),
                cvc: "123".to_string(),
            })
            .unwrap();
        save(&session, &checkout).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_successful_order_clears_state() {
        let store = MemoryStore::new();
        let session = ready_session().await;

        let order = place_order(&store, &session, &user()).await.unwrap();

        assert_eq!(order.total, Price::from_cents(45000));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment.last4, "4242");
        assert!(cart::load(&session).await.unwrap().is_empty());
        assert_eq!(load(&session).await.unwrap(), CheckoutSession::new());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_state_and_retry_succeeds() {
        let store = MemoryStore::new();
        let session = ready_session().await;
        let checkout_before = load(&session).await.unwrap();

        store.set_fail_writes(true);
        let err = place_order(&store, &session, &user()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Store(_)));
        assert_eq!(cart::load(&session).await.unwrap().count(), 1);
        assert_eq!(load(&session).await.unwrap(), checkout_before);
        assert_eq!(store.order_count().await, 0);

        store.set_fail_writes(false);
        place_order(&store, &session, &user()).await.unwrap();
        assert_eq!(store.order_count().await, 1);
        assert!(cart::load(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_writes_nothing() {
        let store = MemoryStore::new();
        let session = ready_session().await;
        cart::clear(&session).await.unwrap();

        let err = place_order(&store, &session, &user()).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Incomplete(OrderError::EmptyCart)
        ));
        assert_eq!(store.order_count().await, 0);
    }
}

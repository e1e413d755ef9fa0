//! Orders built from a completed checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::{CartLine, CartState};
use crate::checkout::{CheckoutSession, PaymentDetails, ShippingAddress};
use crate::types::{OrderId, OrderStatus, Price, UserId};

/// Payment as recorded on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub method: String,
    pub last4: String,
}

impl PaymentSummary {
    pub const CARD: &'static str = "Card";

    #[must_use]
    pub fn card(details: &PaymentDetails) -> Self {
        Self {
            method: Self::CARD.to_owned(),
            last4: details.last4.clone(),
        }
    }
}

/// Why an order cannot be built yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("shipping address is missing")]
    MissingShipping,
    #[error("payment details are missing")]
    MissingPayment,
}

/// An order ready to be written. The store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<CartLine>,
    pub total: Price,
    pub shipping_address: ShippingAddress,
    pub payment: PaymentSummary,
    pub status: OrderStatus,
}

impl NewOrder {
    /// Snapshot the cart and checkout into a `Processing` order.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] when the cart is empty or a checkout step
    /// is missing.
    pub fn from_checkout(
        user_id: UserId,
        cart: &CartState,
        checkout: &CheckoutSession,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let shipping = checkout.shipping().ok_or(OrderError::MissingShipping)?;
        let payment = checkout.payment().ok_or(OrderError::MissingPayment)?;

        Ok(Self {
            user_id,
            items: cart.lines().to_vec(),
            total: cart.total(),
            shipping_address: shipping.clone(),
            payment: PaymentSummary::card(payment),
            status: OrderStatus::Processing,
        })
    }

    /// Attach the identity the store assigned.
    #[must_use]
    pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            user_id: self.user_id,
            items: self.items,
            total: self.total,
            shipping_address: self.shipping_address,
            payment: self.payment,
            status: self.status,
            created_at,
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<CartLine>,
    pub total: Price,
    pub shipping_address: ShippingAddress,
    pub payment: PaymentSummary,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, l| acc.saturating_add(l.quantity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::tests::product;
    use crate::checkout::tests::{payment_form, shipping_form};

    fn ready_checkout() -> CheckoutSession {
        let mut checkout = CheckoutSession::new();
        checkout.submit_shipping(&shipping_form()).unwrap();
        checkout.submit_payment(&payment_form()).unwrap();
        checkout
    }

    #[test]
    fn test_order_snapshot_matches_cart() {
        let mut cart = CartState::new();
        cart.add(product("prod_001", 45000), 1);
        let checkout = ready_checkout();

        let order = NewOrder::from_checkout(UserId::new("u1"), &cart, &checkout).unwrap();

        assert_eq!(order.total, Price::from_cents(45000));
        assert_eq!(order.total.to_string(), "$450.00");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment.method, "Card");
        assert_eq!(order.payment.last4, "1234");
        assert_eq!(order.shipping_address.city, "New York");
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let err = NewOrder::from_checkout(UserId::new("u1"), &CartState::new(), &ready_checkout());
        assert_eq!(err, Err(OrderError::EmptyCart));
    }

    #[test]
    fn test_missing_steps_are_rejected() {
        let mut cart = CartState::new();
        cart.add(product("prod_001", 100), 1);

        let err = NewOrder::from_checkout(UserId::new("u1"), &cart, &CheckoutSession::new());
        assert_eq!(err, Err(OrderError::MissingShipping));

        let mut checkout = CheckoutSession::new();
        checkout.submit_shipping(&shipping_form()).unwrap();
        let err = NewOrder::from_checkout(UserId::new("u1"), &cart, &checkout);
        assert_eq!(err, Err(OrderError::MissingPayment));
    }

    #[test]
    fn test_into_order_and_ownership() {
        let mut cart = CartState::new();
        cart.add(product("prod_001", 100), 3);
        let order = NewOrder::from_checkout(UserId::new("u1"), &cart, &ready_checkout())
            .unwrap()
            .into_order(OrderId::new("ord_1"), Utc::now());

        assert!(order.is_owned_by(&UserId::new("u1")));
        assert!(!order.is_owned_by(&UserId::new("u2")));
        assert_eq!(order.item_count(), 3);
    }

    #[test]
    fn test_stored_order_carries_no_card_number() {
        let mut cart = CartState::new();
        cart.add(product("prod_001", 100), 1);
        let order = NewOrder::from_checkout(UserId::new("u1"), &cart, &ready_checkout()).unwrap();
        let json = serde_json::to_string(&order).unwrap();
        assert!(!json.contains("4242"));
        assert!(!json.contains("cvc"));
    }
}

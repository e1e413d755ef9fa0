//! Session-related types.
//!
//! Everything a visitor carries between requests lives in the session:
//! who they are, their cart, and their in-progress checkout.

use serde::{Deserialize, Serialize};

use cartwright_core::{Email, UserId};

use crate::models::user::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the visitor's [`CartState`](cartwright_core::CartState).
    pub const CART: &str = "cart";

    /// Key for the visitor's [`CheckoutSession`](cartwright_core::CheckoutSession).
    pub const CHECKOUT: &str = "checkout";
}

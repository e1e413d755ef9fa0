//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Email and password accounts, password reset
//! - `cart` - Session-backed cart persistence
//! - `catalog` - Cached product queries
//! - `checkout` - Checkout session persistence and order submission

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

pub use auth::{AuthError, AuthService};
pub use catalog::Catalog;
pub use checkout::CheckoutError;

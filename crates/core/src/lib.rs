//! Cartwright Core - Shared domain library.
//!
//! This crate provides the types and state machines used by the Cartwright
//! storefront and its tooling:
//! - `storefront` - Public-facing e-commerce service
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. Cart and checkout transitions are plain methods on plain
//! structs so they can be persisted anywhere and tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and statuses
//! - [`cart`] - Products, cart lines, and the cart state
//! - [`checkout`] - Shipping/payment input and the checkout session
//! - [`order`] - The order aggregate built at checkout completion
//! - [`validation`] - Field-level validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod order;
pub mod types;
pub mod validation;

pub use cart::{CartLine, CartState, Product};
pub use checkout::{
    CheckoutSession, CheckoutStep, PaymentDetails, PaymentForm, ShippingAddress, ShippingForm,
    TransitionError,
};
pub use order::{NewOrder, Order, OrderError, PaymentSummary};
pub use types::*;
pub use validation::ValidationErrors;

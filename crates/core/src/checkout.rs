//! The three-step checkout wizard.
//!
//! ```text
//! AwaitingShipping ──shipping ok──▶ AwaitingPayment ──payment ok──▶ AwaitingConfirmation
//!                                                                        │
//!                                                        order written   ▼
//!                                                                    Completed { order_id }
//! ```
//!
//! The current step is derived from what the [`CheckoutSession`] holds, so a
//! session rehydrated from storage can never disagree with its own state.
//! Submitting an earlier step again (the "Edit" links on the summary page)
//! replaces that step's data and keeps later data.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::OrderId;
use crate::validation::{ValidationErrors, min_chars};

static CARD_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{16}$").expect("card number pattern is valid"));
static EXPIRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/[0-9]{2}$").expect("expiry pattern is valid"));
static CVC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3,4}$").expect("cvc pattern is valid"));

// =============================================================================
// Shipping
// =============================================================================

/// Shipping form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

/// A validated shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingForm {
    /// Validate every field and build a trimmed [`ShippingAddress`].
    ///
    /// # Errors
    ///
    /// Returns all failing fields with user-facing messages.
    pub fn validate(&self) -> Result<ShippingAddress, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        min_chars(&mut errors, "name", "Name", &self.name, 2);
        min_chars(&mut errors, "line1", "Address", &self.line1, 5);
        min_chars(&mut errors, "city", "City", &self.city, 5);
        min_chars(&mut errors, "state", "State", &self.state, 2);
        min_chars(&mut errors, "postal_code", "Postal code", &self.postal_code, 5);
        min_chars(&mut errors, "country", "Country", &self.country, 2);

        errors.into_result(ShippingAddress {
            name: self.name.trim().to_owned(),
            line1: self.line1.trim().to_owned(),
            line2: self
                .line2
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
        })
    }
}

impl From<&ShippingAddress> for ShippingForm {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            name: address.name.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Payment form as submitted.
///
/// Holds the full card number and CVC, so it is never stored and its
/// `Debug` output is redacted.
#[derive(Clone, Default, Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub card_name: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry_date: String,
    #[serde(default)]
    pub cvc: String,
}

impl fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentForm")
            .field("card_name", &self.card_name)
            .field("card_number", &"[REDACTED]")
            .field("expiry_date", &self.expiry_date)
            .field("cvc", &"[REDACTED]")
            .finish()
    }
}

/// Payment details retained after entry: only the last four digits survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub cardholder_name: String,
    pub last4: String,
    pub expiry: String,
}

impl PaymentForm {
    /// Validate the card fields and keep only what later steps display.
    ///
    /// Spaces in the card number are ignored.
    ///
    /// # Errors
    ///
    /// Returns all failing fields with user-facing messages.
    pub fn validate(&self) -> Result<PaymentDetails, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        min_chars(&mut errors, "card_name", "Name", &self.card_name, 2);

        let digits: String = self.card_number.chars().filter(|c| *c != ' ').collect();
        if !CARD_NUMBER.is_match(&digits) {
            errors.add("card_number", "Card number must be 16 digits.");
        }
        let expiry = self.expiry_date.trim();
        if !EXPIRY.is_match(expiry) {
            errors.add("expiry_date", "Expiry date must be in MM/YY format.");
        }
        if !CVC.is_match(self.cvc.trim()) {
            errors.add("cvc", "CVC must be 3 or 4 digits.");
        }

        let last4 = digits
            .char_indices()
            .nth_back(3)
            .map_or_else(String::new, |(idx, _)| digits[idx..].to_owned());

        errors.into_result(PaymentDetails {
            cardholder_name: self.card_name.trim().to_owned(),
            last4,
            expiry: expiry.to_owned(),
        })
    }
}

// =============================================================================
// Session
// =============================================================================

/// Where a visitor is in the checkout wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CheckoutStep {
    AwaitingShipping,
    AwaitingPayment,
    AwaitingConfirmation,
    /// Terminal: the order was written and the session cleared.
    Completed { order_id: OrderId },
}

impl CheckoutStep {
    /// Path of the page that serves this step.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::AwaitingShipping => "/checkout/shipping".to_owned(),
            Self::AwaitingPayment => "/checkout/payment".to_owned(),
            Self::AwaitingConfirmation => "/checkout/summary".to_owned(),
            Self::Completed { order_id } => format!("/order-confirmation/{order_id}"),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::AwaitingShipping => 0,
            Self::AwaitingPayment => 1,
            Self::AwaitingConfirmation => 2,
            Self::Completed { .. } => 3,
        }
    }
}

/// Error moving the wizard forward.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// A previous step has not been completed.
    #[error("checkout step unavailable, resume at {}", .resume_at.path())]
    OutOfOrder { resume_at: CheckoutStep },

    /// The submitted form is invalid; the session was not changed.
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}

/// Transient shipping and payment input carried between checkout pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    shipping: Option<ShippingAddress>,
    #[serde(default)]
    payment: Option<PaymentDetails>,
}

impl CheckoutSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            shipping: None,
            payment: None,
        }
    }

    #[must_use]
    pub const fn shipping(&self) -> Option<&ShippingAddress> {
        self.shipping.as_ref()
    }

    #[must_use]
    pub const fn payment(&self) -> Option<&PaymentDetails> {
        self.payment.as_ref()
    }

    /// The first step still waiting for input.
    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        match (&self.shipping, &self.payment) {
            (None, _) => CheckoutStep::AwaitingShipping,
            (Some(_), None) => CheckoutStep::AwaitingPayment,
            (Some(_), Some(_)) => CheckoutStep::AwaitingConfirmation,
        }
    }

    /// Guard for viewing or submitting `step`.
    ///
    /// # Errors
    ///
    /// Returns the first incomplete step when `step` lies beyond it.
    pub fn require(&self, step: &CheckoutStep) -> Result<(), CheckoutStep> {
        let current = self.step();
        if step.rank() > current.rank() {
            Err(current)
        } else {
            Ok(())
        }
    }

    /// Submit the shipping step.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Invalid`] without touching the session.
    pub fn submit_shipping(&mut self, form: &ShippingForm) -> Result<CheckoutStep, TransitionError> {
        let address = form.validate()?;
        self.shipping = Some(address);
        Ok(self.step())
    }

    /// Submit the payment step.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::OutOfOrder`] when shipping is missing and
    /// [`TransitionError::Invalid`] for bad input. The session is unchanged
    /// in both cases.
    pub fn submit_payment(&mut self, form: &PaymentForm) -> Result<CheckoutStep, TransitionError> {
        self.require(&CheckoutStep::AwaitingPayment)
            .map_err(|resume_at| TransitionError::OutOfOrder { resume_at })?;
        let details = form.validate()?;
        self.payment = Some(details);
        Ok(self.step())
    }

    /// Finish the wizard once the order is persisted, consuming the session.
    #[must_use]
    pub fn complete(self, order_id: OrderId) -> CheckoutStep {
        CheckoutStep::Completed { order_id }
    }
}

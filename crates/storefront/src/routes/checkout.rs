//! Checkout route handlers.
//!
//! The wizard runs shipping, then payment, then a summary page that places
//! the order. Every page is guarded: an empty cart sends the visitor back to
//! `/cart`, and asking for a step ahead of the session sends them to the
//! first incomplete one.

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;
use tracing::instrument;

use cartwright_core::{
    CartState, CheckoutSession, CheckoutStep, PaymentDetails, PaymentForm, ShippingAddress,
    ShippingForm, TransitionError,
};

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::routes::cart::CartView;
use crate::services::{cart, checkout};
use crate::state::AppState;

/// Where an empty cart sends the visitor.
const CART_PATH: &str = "/cart";

/// Response for a checkout page the visitor cannot use right now.
#[derive(Debug)]
pub enum StepRejection {
    /// Send the visitor elsewhere (empty cart or an earlier step).
    Redirect(String),
    /// Anything else, rendered as an [`AppError`].
    Error(AppError),
}

impl IntoResponse for StepRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(path) => Redirect::to(&path).into_response(),
            Self::Error(err) => err.into_response(),
        }
    }
}

impl From<AppError> for StepRejection {
    fn from(err: AppError) -> Self {
        Self::Error(err)
    }
}

impl From<SessionError> for StepRejection {
    fn from(err: SessionError) -> Self {
        Self::Error(AppError::Session(err))
    }
}

impl From<TransitionError> for StepRejection {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::OutOfOrder { resume_at } => Self::Redirect(resume_at.path()),
            TransitionError::Invalid(errors) => Self::Error(AppError::Validation(errors)),
        }
    }
}

type StepResult<T> = std::result::Result<T, StepRejection>;

/// Load the cart and checkout session, enforcing the guard for `step`.
async fn enter(
    session: &Session,
    step: &CheckoutStep,
) -> StepResult<(CartState, CheckoutSession)> {
    let cart_state = cart::load(session).await?;
    if cart_state.is_empty() {
        return Err(StepRejection::Redirect(CART_PATH.to_owned()));
    }

    let checkout_session = checkout::load(session).await?;
    if let Err(resume_at) = checkout_session.require(step) {
        return Err(StepRejection::Redirect(resume_at.path()));
    }
    Ok((cart_state, checkout_session))
}

/// Shipping page data. Prefills from a previous submission.
#[derive(Debug, Serialize)]
pub struct ShippingView {
    pub step: CheckoutStep,
    pub cart: CartView,
    pub shipping: Option<ShippingAddress>,
}

/// Payment page data.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub step: CheckoutStep,
    pub cart: CartView,
    pub shipping: Option<ShippingAddress>,
    pub payment: Option<PaymentDetails>,
}

/// Order summary page data.
#[derive(Debug, Serialize)]
pub struct SummaryView {
    pub step: CheckoutStep,
    pub cart: CartView,
    pub shipping: Option<ShippingAddress>,
    pub payment: Option<PaymentDetails>,
}

/// Send the visitor to whichever step they should be on.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn start(RequireAuth(user): RequireAuth, session: Session) -> StepResult<Redirect> {
    let (_, checkout_session) = enter(&session, &CheckoutStep::AwaitingShipping).await?;
    Ok(Redirect::to(&checkout_session.step().path()))
}

/// Shipping page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn shipping(
    RequireAuth(user): RequireAuth,
    session: Session,
) -> StepResult<Json<ShippingView>> {
    let (cart_state, checkout_session) = enter(&session, &CheckoutStep::AwaitingShipping).await?;
    Ok(Json(ShippingView {
        step: checkout_session.step(),
        cart: CartView::from(&cart_state),
        shipping: checkout_session.shipping().cloned(),
    }))
}

/// Save the shipping address and move on.
///
/// Resubmitting shipping keeps any payment details already entered.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn submit_shipping(
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<ShippingForm>,
) -> StepResult<Redirect> {
    let (_, mut checkout_session) = enter(&session, &CheckoutStep::AwaitingShipping).await?;
    let next = checkout_session.submit_shipping(&form)?;
    checkout::save(&session, &checkout_session).await?;

    add_breadcrumb("checkout", "Shipping saved", None);
    Ok(Redirect::to(&next.path()))
}

/// Payment page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn payment(
    RequireAuth(user): RequireAuth,
    session: Session,
) -> StepResult<Json<PaymentView>> {
    let (cart_state, checkout_session) = enter(&session, &CheckoutStep::AwaitingPayment).await?;
    Ok(Json(PaymentView {
        step: checkout_session.step(),
        cart: CartView::from(&cart_state),
        shipping: checkout_session.shipping().cloned(),
        payment: checkout_session.payment().cloned(),
    }))
}

/// Save the payment details and move on to the summary.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn submit_payment(
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<PaymentForm>,
) -> StepResult<Redirect> {
    let (_, mut checkout_session) = enter(&session, &CheckoutStep::AwaitingPayment).await?;
    let next = checkout_session.submit_payment(&form)?;
    checkout::save(&session, &checkout_session).await?;

    add_breadcrumb("checkout", "Payment saved", None);
    Ok(Redirect::to(&next.path()))
}

/// Order summary page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn summary(
    RequireAuth(user): RequireAuth,
    session: Session,
) -> StepResult<Json<SummaryView>> {
    let (cart_state, checkout_session) =
        enter(&session, &CheckoutStep::AwaitingConfirmation).await?;
    Ok(Json(SummaryView {
        step: checkout_session.step(),
        cart: CartView::from(&cart_state),
        shipping: checkout_session.shipping().cloned(),
        payment: checkout_session.payment().cloned(),
    }))
}

/// Place the order and go to its confirmation page.
///
/// Unlike the pages, this does not redirect: an empty cart or a missing step
/// is a 400, and a failed write is a 502 that leaves the cart and checkout
/// session in place so the visitor can press the button again.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Redirect, AppError> {
    let checkout_session = checkout::load(&session).await?;
    let order = checkout::place_order(state.orders(), &session, &user).await?;

    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
    let done = checkout_session.complete(order.id);
    Ok(Redirect::to(&done.path()))
}

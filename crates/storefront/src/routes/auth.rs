//! Authentication route handlers.
//!
//! Email and password accounts. Logging in keeps the visitor's cart and
//! checkout progress; logging out drops the whole session. A forgotten
//! password is replaced through a single-use reset link.

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::services::auth::MIN_PASSWORD_LENGTH;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data. `token` comes from the reset link.
#[derive(Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// The signed-in user.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: CurrentUser,
}

/// What the login page needs to render its forms.
#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub login: &'static str,
    pub register: &'static str,
    pub forgot_password: &'static str,
    pub min_password_length: usize,
}

/// A plain confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub message: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

/// Login page. Visitors without a session are sent here by the checkout guard.
pub async fn login_page() -> Json<LoginPage> {
    Json(LoginPage {
        login: "/auth/login",
        register: "/auth/register",
        forgot_password: "/auth/forgot-password",
        min_password_length: MIN_PASSWORD_LENGTH,
    })
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Json<SessionView>> {
    let user = AuthService::new(state.users())
        .login(&form.email, &form.password)
        .await?;
    let current = sign_in(&session, &user).await?;

    add_breadcrumb("auth", "Logged in", None);
    Ok(Json(SessionView { user: current }))
}

/// Handle registration form submission. The new account is signed in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let user = AuthService::new(state.users())
        .register(&form.email, &form.password, &form.password_confirm)
        .await?;
    let current = sign_in(&session, &user).await?;

    add_breadcrumb("auth", "Registered", None);
    Ok((StatusCode::CREATED, Json(SessionView { user: current })).into_response())
}

/// Request a reset link.
///
/// The response is the same whether or not the email has an account.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<(StatusCode, Json<MessageView>)> {
    AuthService::new(state.users())
        .request_password_reset(&form.email)
        .await?;

    add_breadcrumb("auth", "Password reset requested", None);
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageView {
            message: "If an account exists for that email, a reset link has been sent.",
        }),
    ))
}

/// Set a new password from a reset link. The visitor then logs in as usual.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Json<MessageView>> {
    AuthService::new(state.users())
        .reset_password(&form.token, &form.password, &form.password_confirm)
        .await?;

    add_breadcrumb("auth", "Password reset", None);
    Ok(Json(MessageView {
        message: "Your password has been reset. Please log in.",
    }))
}

/// Log out and clear the session.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user, or 401.
///
/// A session whose account no longer exists is treated as signed out.
#[instrument(skip_all)]
pub async fn me(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<SessionView>> {
    let user = user.ok_or_else(|| AppError::Unauthorized("not signed in".to_string()))?;
    let account = state
        .users()
        .get_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_string()))?;

    Ok(Json(SessionView {
        user: CurrentUser::from(&account),
    }))
}

async fn sign_in(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    tracing::info!(user_id = %current.id, "user signed in");
    Ok(current)
}

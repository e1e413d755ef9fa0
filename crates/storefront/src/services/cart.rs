//! Session-backed cart persistence.
//!
//! The cart is written back to the session after every mutation and read
//! fresh on every request. State that no longer deserialises (for example
//! after a schema change) is dropped rather than failing the request.

use serde::de::DeserializeOwned;
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use cartwright_core::CartState;

use crate::models::session_keys;

/// Read a value from the session, treating undecodable data as absent.
pub(crate) async fn get_or_default<T>(session: &Session, key: &str) -> Result<T, SessionError>
where
    T: DeserializeOwned + Default,
{
    match session.get::<T>(key).await {
        Ok(value) => Ok(value.unwrap_or_default()),
        Err(SessionError::SerdeJson(e)) => {
            tracing::warn!(key, error = %e, "Discarding undecodable session value");
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

/// Load the visitor's cart, or an empty one.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<CartState, SessionError> {
    let cart: CartState = get_or_default(session, session_keys::CART).await?;
    Ok(cart.normalized())
}

/// Persist the visitor's cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save(session: &Session, cart: &CartState) -> Result<(), SessionError> {
    session.insert(session_keys::CART, cart).await
}

/// Load, apply `f`, and persist.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn update<F>(session: &Session, f: F) -> Result<CartState, SessionError>
where
    F: FnOnce(&mut CartState) + Send,
{
    let mut cart = load(session).await?;
    f(&mut cart);
    save(session, &cart).await?;
    Ok(cart)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear(session: &Session) -> Result<(), SessionError> {
    session.remove::<CartState>(session_keys::CART).await?;
    Ok(())
}

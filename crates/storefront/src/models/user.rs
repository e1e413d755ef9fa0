//! User domain types.

use chrono::{DateTime, Utc};

use cartwright_core::{Email, UserId};

/// A storefront account (domain type, separate from the database row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

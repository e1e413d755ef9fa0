//! User repository backed by `storefront.user` and `storefront.password_reset`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use cartwright_core::{Email, UserId};

use super::{RepositoryError, UserStore};
use crate::models::user::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserWithPasswordRow {
    id: UserId,
    email: String,
    created_at: DateTime<Utc>,
    password_hash: String,
}

fn parse_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            email: parse_email(&row.email)?,
            created_at: row.created_at,
        })
    }
}

/// Repository for user accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[instrument(skip(self, email, password_hash), fields(email = %email))]
    async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO storefront.user (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, created_at
            ",
        )
        .bind(UserId::generate())
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| super::conflict_on_unique(e, "email"))?;

        User::try_from(row)
    }

    #[instrument(skip(self, email), fields(email = %email))]
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(
            r"
            SELECT id, email, created_at, password_hash
            FROM storefront.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let user = User {
            id: r.id,
            email: parse_email(&r.email)?,
            created_at: r.created_at,
        };

        Ok(Some((user, r.password_hash)))
    }

    #[instrument(skip(self, id), fields(user_id = %id))]
    async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, created_at
            FROM storefront.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    #[instrument(skip(self, user_id, token_hash), fields(user_id = %user_id))]
    async fn create_reset_token(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            DELETE FROM storefront.password_reset
            WHERE user_id = $1 AND used_at IS NULL
            ",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.password_reset (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            WITH redeemed AS (
                UPDATE storefront.password_reset
                SET used_at = $3
                WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $3
                RETURNING user_id
            )
            UPDATE storefront.user AS u
            SET password_hash = $2
            FROM redeemed
            WHERE u.id = redeemed.user_id
            RETURNING u.id, u.email, u.created_at
            ",
        )
        .bind(token_hash)
        .bind(password_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}

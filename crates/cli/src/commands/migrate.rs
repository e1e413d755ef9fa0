//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending storefront migrations
//! cw-cli migrate run
//!
//! # Show which migrations are applied
//! cw-cli migrate status
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//!
//! Migration files live in `crates/storefront/migrations/` and are embedded
//! into the binary at compile time.

use std::collections::HashSet;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::{Migrate, MigrateError, Migrator};

static MIGRATOR: Migrator = sqlx::migrate!("../storefront/migrations");

/// Errors raised while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrateError),
}

fn database_url() -> Result<SecretString, MigrationError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Connect to the storefront database named by the environment.
pub(crate) async fn connect() -> Result<PgPool, MigrationError> {
    let url = database_url()?;
    tracing::info!("Connecting to storefront database...");
    Ok(PgPool::connect(url.expose_secret()).await?)
}

/// Apply every pending storefront migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}

/// Log each known migration and whether it has been applied.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn status() -> Result<(), MigrationError> {
    let pool = connect().await?;
    let mut conn = pool.acquire().await?;

    conn.ensure_migrations_table().await?;
    let applied: HashSet<i64> = conn
        .list_applied_migrations()
        .await?
        .into_iter()
        .map(|m| m.version)
        .collect();

    let mut pending = 0_usize;
    for migration in MIGRATOR.iter() {
        let is_applied = applied.contains(&migration.version);
        if !is_applied {
            pending += 1;
        }
        tracing::info!(
            version = migration.version,
            description = %migration.description,
            applied = is_applied,
            "migration"
        );
    }

    tracing::info!(pending, "Migration status checked");
    Ok(())
}

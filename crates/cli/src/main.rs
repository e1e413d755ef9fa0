//! Cartwright CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending storefront migrations
//! cw-cli migrate run
//!
//! # Show applied and pending migrations
//! cw-cli migrate status
//!
//! # Upsert the demo catalog into the product table
//! cw-cli seed products
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cw-cli")]
#[command(author, version, about = "Cartwright CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage storefront database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Load data into the storefront database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply pending migrations
    Run,
    /// Show applied and pending migrations
    Status,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert catalog products (the bundled demo catalog by default)
    Products {
        /// JSON catalog to load instead of the demo catalog
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { action } => match action {
            MigrateAction::Run => commands::migrate::run().await?,
            MigrateAction::Status => commands::migrate::status().await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(file.as_deref()).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_migrate_run() {
        let cli = Cli::try_parse_from(["cw-cli", "migrate", "run"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Migrate {
                action: MigrateAction::Run
            }
        ));
    }

    #[test]
    fn test_parses_seed_products() {
        let cli = Cli::try_parse_from(["cw-cli", "seed", "products"]).unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Seed {
                target: SeedTarget::Products { file: None }
            }
        ));

        let cli = Cli::try_parse_from(["cw-cli", "seed", "products", "--file", "catalog.json"])
            .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Seed {
            target: SeedTarget::Products { file },
        } = cli.command
        else {
            panic!("expected seed products");
        };
        assert_eq!(file, Some(PathBuf::from("catalog.json")));
    }

    #[test]
    fn test_seed_requires_a_target() {
        assert!(Cli::try_parse_from(["cw-cli", "seed"]).is_err());
    }
}

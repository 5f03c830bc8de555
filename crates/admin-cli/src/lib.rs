//! Operator command line for the marketplace.
//!
//! Subcommands map one to one onto marketplace workflows and queries and
//! print plain text lines to stdout. Logs go to stderr.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod telemetry;

use marketplace::Marketplace;
use record_store::PostgresRecordStore;
use sqlx::postgres::PgPoolOptions;

pub use cli::{Cli, Command};
pub use commands::execute;
pub use config::{Config, LogFormat};
pub use error::{CliError, Result};

/// Connects to PostgreSQL and runs `cli`'s command.
pub async fn run(cli: Cli, config: &Config) -> Result<()> {
    let database_url = cli
        .database_url
        .or_else(|| config.database_url.clone())
        .ok_or_else(|| CliError::Config("DATABASE_URL is not set".to_string()))?;

    tracing::debug!(max_connections = config.max_connections, "connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&database_url)
        .await?;
    let store = PostgresRecordStore::new(pool);

    if let Command::Migrate = cli.command {
        store.run_migrations().await?;
        tracing::info!("migrations applied");
        println!("migrations applied");
        return Ok(());
    }

    let market = Marketplace::new(store);
    let mut stdout = std::io::stdout();
    execute(&market, cli.command, &mut stdout).await
}

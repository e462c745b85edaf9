//! # payroll-admin
//!
//! Operator binary for the payroll engine. Connects to PostgreSQL,
//! applies the schema and runs one command.
//!
//! ## Quick Start
//!
//! 1. Set up PostgreSQL and create the database
//! 2. Put `DATABASE_URL` (and optional settings) in `.env`
//! 3. `payroll-admin config set --tenant <uuid> --currency INR`
//! 4. `payroll-admin payrun create --tenant <uuid> --month 2025-03 --initiated-by <uuid>`
//!
//! Set `RUST_LOG` to change log verbosity (default: `info`). Logs go to
//! stderr; the JSON result goes to stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use payroll_backend::cli::{execute, Cli, Commands};
use payroll_backend::config::AppConfig;
use payroll_backend::db::{Database, PayrollRepository, PgStore};
use payroll_backend::services::PayrollService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // =========================================
    // STEP 1: Load Environment & Logging
    // =========================================
    dotenvy::dotenv().ok(); // It's okay if .env doesn't exist

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // =========================================
    // STEP 2: Load Configuration
    // =========================================
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded (currency {}, payrun timeout {}s)",
        config.default_currency, config.payrun_timeout_secs
    );

    // =========================================
    // STEP 3: Initialize Database
    // =========================================
    let db = Database::connect(&config.database_url, config.database_pool_size)
        .await
        .context("Failed to connect to database")?;
    db.run_migrations().await.context("Failed to run migrations")?;

    let store: Arc<dyn PayrollRepository> = Arc::new(PgStore::new(db));
    let service = PayrollService::new(store, config.engine_settings());

    // =========================================
    // STEP 4: Run Command
    // =========================================
    if let Commands::Reconcile { watch: true } = cli.command {
        service
            .reconciler()
            .start_watch_loop(Duration::from_secs(config.reconciliation_interval))
            .await;
        return Ok(());
    }

    let response = execute(&service, cli.command).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

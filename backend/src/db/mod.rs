//! # Database Module
//!
//! This module handles all persistence for the payroll engine.
//! We use PostgreSQL for storing:
//!
//! - Payroll configurations (one per tenant)
//! - Salary structures (versioned, one active per employee)
//! - Payroll records (one per employee per payrun)
//! - Payrun summaries (one per batch execution)
//!
//! The employee roster lives in a table owned by the HR subsystem; this
//! module only reads it.
//!
//! ## Store Backends
//!
//! The engine talks to storage through the traits in [`store`]. Two
//! backends implement them:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      STORE TRAITS                                │
//! │  EmployeeRoster · SalaryStructureStore · ConfigurationStore ·    │
//! │  PayrollStore                                                    │
//! └─────────────────────────────────────────────────────────────────┘
//!               │                                 │
//!       ┌───────┴────────┐               ┌────────┴───────┐
//!       │    PgStore     │               │  MemoryStore   │
//!       │ (deadpool-     │               │ (arena + index │
//!       │  postgres)     │               │  under RwLock) │
//!       └────────────────┘               └────────────────┘
//! ```

pub mod memory;
pub mod models;
pub mod queries;
pub mod store;

use deadpool_postgres::{Config, Pool, Runtime};
use thiserror::Error;
use tokio_postgres::{Config as TokioConfig, NoTls};
use tracing::{error, info, warn};

/// Schema applied at startup. Every statement is idempotent.
const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to connect to the database
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryError(#[from] tokio_postgres::Error),

    /// Migration failed
    #[error("Migration failed: {0}")]
    MigrationError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A stored value could not be decoded into its domain type
    #[error("Corrupt row: {0}")]
    DecodeError(String),

    /// The backing store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Database connection wrapper.
///
/// This struct wraps the connection pool. It is cheap to clone.
///
/// ## Usage
///
/// ```rust,ignore
/// let db = Database::connect("postgres://...", 10).await?;
/// let store = PgStore::new(db);
/// ```
#[derive(Clone)]
pub struct Database {
    /// The connection pool
    pool: Pool,
}

impl Database {
    /// Connect to the PostgreSQL database.
    ///
    /// ## Arguments
    ///
    /// * `database_url` - PostgreSQL connection string
    /// * `max_size` - Maximum pooled connections
    pub async fn connect(database_url: &str, max_size: usize) -> Result<Self, DatabaseError> {
        info!("Connecting to database...");

        let tokio_config = database_url
            .parse::<TokioConfig>()
            .map_err(|e| DatabaseError::ConfigError(format!("Invalid database URL: {}", e)))?;

        let mut config = Config::new();

        if let Some(dbname) = tokio_config.get_dbname() {
            config.dbname = Some(dbname.to_string());
        }
        if let Some(user) = tokio_config.get_user() {
            config.user = Some(user.to_string());
        }
        if let Some(password) = tokio_config.get_password() {
            config.password = Some(String::from_utf8_lossy(password).to_string());
        }
        if let Some(tokio_postgres::config::Host::Tcp(host)) = tokio_config.get_hosts().first() {
            config.host = Some(host.clone());
        }
        if let Some(port) = tokio_config.get_ports().first() {
            config.port = Some(*port);
        }

        config.pool = Some(deadpool_postgres::PoolConfig {
            max_size,
            ..Default::default()
        });

        let pool = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        // Verify the pool can hand out a working connection
        let client = pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
        client
            .query("SELECT 1", &[])
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("Database connection established (pool size {})", max_size);

        Ok(Self { pool })
    }

    /// Apply the schema.
    ///
    /// The schema uses `IF NOT EXISTS` throughout, so running it against an
    /// initialised database is a no-op. Duplicate-object errors raised by
    /// older PostgreSQL versions are tolerated.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        info!("Running database migrations...");

        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        match client.batch_execute(INITIAL_SCHEMA).await {
            Ok(()) => {
                info!("Migrations completed successfully");
                Ok(())
            }
            Err(e) => {
                // 42P07 = duplicate_table, 42710 = duplicate_object
                let code = e.code().map(|c| c.code().to_string());
                let is_duplicate = matches!(code.as_deref(), Some("42P07") | Some("42710"));

                if is_duplicate {
                    warn!(
                        "Some database objects already exist (code {:?}); continuing",
                        code
                    );
                    return Ok(());
                }

                let detail = e
                    .as_db_error()
                    .and_then(|db_err| db_err.detail())
                    .unwrap_or("No detail available")
                    .to_string();
                error!("Migration execution error: {} ({})", e, detail);

                Err(DatabaseError::MigrationError(format!(
                    "{} (code {:?}, detail: {})",
                    e, code, detail
                )))
            }
        }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

pub use memory::MemoryStore;
pub use models::*;
pub use queries::PgStore;
pub use store::*;

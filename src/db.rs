pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
pub mod request_repo;
pub use request_repo::RequestRepository;
pub mod vehicle_repo;
pub use vehicle_repo::VehicleRepository;

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};

use crate::config::Config;

/// Opens the workflow store: WAL journal, foreign keys on, and a per-connection
/// busy timeout that bounds how long a statement waits for the write lock.
pub async fn connect(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(config.db_busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect_with(options)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

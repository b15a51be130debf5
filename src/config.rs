// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use sqlx::SqlitePool;

use crate::{
    common::{db_utils::RetryPolicy, error::AppError},
    db::{self, AuditRepository, EmployeeRepository, RequestRepository, VehicleRepository},
    models::auth::Role,
    services::{
        audit_service::AuditService,
        auth::{hash_password, IdentityProvider, SessionStore},
        availability_service::AvailabilityService,
        fleet_service::FleetService,
        lifecycle_service::LifecycleService,
        status_normalizer::StatusNormalizer,
    },
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_busy_timeout_ms: u64,
    pub store_retry_attempts: u32,
    pub store_retry_base_ms: u64,
    pub session_ttl_hours: i64,
    pub session_refresh_grace_minutes: i64,
    pub seed_demo_data: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://request_hub.db".into(),
            bind_addr: "0.0.0.0:4000".into(),
            db_max_connections: 5,
            db_acquire_timeout_secs: 10,
            db_busy_timeout_ms: 5000,
            store_retry_attempts: 3,
            store_retry_base_ms: 100,
            session_ttl_hours: 24,
            session_refresh_grace_minutes: 60,
            seed_demo_data: false,
            admin_email: None,
            admin_password: None,
        }
    }
}

fn var_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

fn flag(key: &str) -> bool {
    env::var(key).is_ok_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

impl Config {
    /// Reads the environment (after `.env`), falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            database_url: var_or("DATABASE_URL", defaults.database_url)?,
            bind_addr: var_or("BIND_ADDR", defaults.bind_addr)?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_acquire_timeout_secs: var_or("DB_ACQUIRE_TIMEOUT_SECS", defaults.db_acquire_timeout_secs)?,
            db_busy_timeout_ms: var_or("DB_BUSY_TIMEOUT_MS", defaults.db_busy_timeout_ms)?,
            store_retry_attempts: var_or("STORE_RETRY_ATTEMPTS", defaults.store_retry_attempts)?,
            store_retry_base_ms: var_or("STORE_RETRY_BASE_MS", defaults.store_retry_base_ms)?,
            session_ttl_hours: var_or("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            session_refresh_grace_minutes: var_or(
                "SESSION_REFRESH_GRACE_MINUTES",
                defaults.session_refresh_grace_minutes,
            )?,
            seed_demo_data: flag("SEED_DEMO_DATA"),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.store_retry_attempts, Duration::from_millis(self.store_retry_base_ms))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub employee_repo: EmployeeRepository,
    pub sessions: SessionStore,
    pub identity: Arc<dyn IdentityProvider>,
    pub lifecycle: LifecycleService,
    pub availability: AvailabilityService,
    pub fleet: FleetService,
}

impl AppState {
    /// Connects, migrates and wires the service graph.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = db::connect(&config).await?;
        tracing::info!(url = %config.database_url, "database connected");

        db::run_migrations(&db_pool).await?;
        tracing::info!("database migrations applied");

        let state = Self::from_pool(db_pool, config);
        state.bootstrap().await?;
        Ok(state)
    }

    /// Builds the service graph over an already-migrated pool.
    pub fn from_pool(db_pool: SqlitePool, config: Config) -> Self {
        let retry = config.retry_policy();

        // --- Repositórios ---
        let employee_repo = EmployeeRepository::new(db_pool.clone());
        let request_repo = RequestRepository::new(db_pool.clone());
        let vehicle_repo = VehicleRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());

        // --- Serviços ---
        let sessions = SessionStore::new(
            employee_repo.clone(),
            chrono::Duration::hours(config.session_ttl_hours),
            chrono::Duration::minutes(config.session_refresh_grace_minutes),
        );
        let availability = AvailabilityService::new(vehicle_repo.clone());
        let lifecycle = LifecycleService::new(
            db_pool.clone(),
            request_repo.clone(),
            vehicle_repo.clone(),
            availability.clone(),
            AuditService::new(audit_repo),
            StatusNormalizer::new(request_repo, db_pool.clone()),
            retry,
        );
        let fleet = FleetService::new(vehicle_repo);

        Self {
            db_pool,
            config: Arc::new(config),
            employee_repo,
            identity: Arc::new(sessions.clone()),
            sessions,
            lifecycle,
            availability,
            fleet,
        }
    }

    /// Optional first-run data: a super admin from ADMIN_EMAIL/ADMIN_PASSWORD
    /// and the demo fleet.
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        if let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password) {
            if self.employee_repo.find_by_email(email).await?.is_none() {
                let password_hash = hash_password(password).await?;
                let admin = self
                    .employee_repo
                    .create(&self.db_pool, email, &password_hash, "Administrator", "IT", Role::SuperAdmin)
                    .await?;
                tracing::info!(employee_id = admin.id, "bootstrap super admin created");
            }
        }

        if self.config.seed_demo_data {
            self.fleet.seed_demo_vehicles().await?;
        }

        let purged = self.sessions.purge_expired().await?;
        tracing::debug!(purged, "startup session cleanup done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.session_refresh_grace_minutes, 60);
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        assert!(var_or::<u32>("REQUEST_HUB_TEST_UNSET_VAR", 7).is_ok_and(|v| v == 7));
    }
}

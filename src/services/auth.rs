// src/services/auth.rs

use async_trait::async_trait;
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::EmployeeRepository,
    models::auth::{Actor, AuthResponse, Employee, LoginPayload, RefreshResponse, Session},
};

/// Turns a bearer token into the caller the engine acts for.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Actor, AppError>;
}

/// Hashes on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("hashing task failed: {e}"))??;

    Ok(hashed)
}

/// Opaque tokens kept in the `sessions` table with an explicit expiry.
#[derive(Clone)]
pub struct SessionStore {
    employees: EmployeeRepository,
    ttl: Duration,
    refresh_grace: Duration,
}

impl SessionStore {
    pub fn new(employees: EmployeeRepository, ttl: Duration, refresh_grace: Duration) -> Self {
        Self {
            employees,
            ttl,
            refresh_grace,
        }
    }

    pub async fn login(&self, payload: &LoginPayload) -> Result<AuthResponse, AppError> {
        payload.validate()?;

        let employee = self
            .employees
            .find_by_email(payload.email.trim())
            .await?
            .filter(|e| e.is_active)
            .ok_or(AppError::InvalidCredentials)?;

        let password = payload.password.clone();
        let password_hash = employee.password_hash.clone();
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))??;

        if !is_password_valid {
            tracing::info!(employee_id = employee.id, "login rejected: bad password");
            return Err(AppError::InvalidCredentials);
        }

        let token = Uuid::new_v4().simple().to_string();
        let session = self
            .employees
            .insert_session(&token, employee.id, Utc::now() + self.ttl)
            .await?;

        tracing::info!(employee_id = employee.id, role = %employee.role, "session opened");
        Ok(AuthResponse {
            token: session.token,
            token_expires_at: session.expires_at,
            user: employee,
        })
    }

    /// The employee behind a live session.
    pub async fn me(&self, token: &str) -> Result<Employee, AppError> {
        let session = self.live_session(token, Utc::now()).await?;
        self.active_employee(session.employee_id).await
    }

    /// Pushes the expiry out by a full TTL. Allowed until the grace period
    /// after expiry runs out.
    pub async fn refresh(&self, token: &str) -> Result<RefreshResponse, AppError> {
        let now = Utc::now();
        let session = self.employees.find_session(token).await?.ok_or(AppError::InvalidToken)?;
        if session.expires_at + self.refresh_grace <= now {
            return Err(AppError::InvalidToken);
        }
        self.active_employee(session.employee_id).await?;

        let expires_at = now + self.ttl;
        if !self.employees.extend_session(token, expires_at).await? {
            return Err(AppError::InvalidToken);
        }

        tracing::debug!(employee_id = session.employee_id, "session refreshed");
        Ok(RefreshResponse { expires_at })
    }

    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        if self.employees.delete_session(token).await? {
            tracing::debug!("session closed");
        }
        Ok(())
    }

    /// Removes sessions that can no longer be refreshed.
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let purged = self
            .employees
            .delete_sessions_expired_before(Utc::now() - self.refresh_grace)
            .await?;
        if purged > 0 {
            tracing::info!(purged, "expired sessions purged");
        }
        Ok(purged)
    }

    async fn live_session(&self, token: &str, now: DateTime<Utc>) -> Result<Session, AppError> {
        self.employees
            .find_session(token)
            .await?
            .filter(|s| s.expires_at > now)
            .ok_or(AppError::InvalidToken)
    }

    async fn active_employee(&self, employee_id: i64) -> Result<Employee, AppError> {
        self.employees
            .find_by_id(employee_id)
            .await?
            .filter(|e| e.is_active)
            .ok_or(AppError::InvalidToken)
    }
}

#[async_trait]
impl IdentityProvider for SessionStore {
    async fn resolve(&self, token: &str) -> Result<Actor, AppError> {
        let session = self.live_session(token, Utc::now()).await?;
        let employee = self.active_employee(session.employee_id).await?;
        Ok(employee.actor())
    }
}

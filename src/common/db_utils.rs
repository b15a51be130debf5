// src/common/db_utils.rs

use std::{future::Future, time::Duration};

use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::time::sleep;

use crate::common::error::AppError;

// Códigos primários do SQLite (byte baixo do código estendido).
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// True for contention signals worth retrying: BUSY, LOCKED (any extended
/// variant) and pool acquire timeouts.
pub fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}

/// Opens a transaction that takes the write lock up-front. Every
/// multi-record lifecycle operation runs inside one of these.
pub async fn begin_immediate(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, AppError> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy is exhausted. Exhaustion surfaces as `AppError::Unavailable`.
pub async fn retry_on_busy<T, F, Fut>(
    policy: RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_transient() => {
                if attempt >= policy.max_attempts {
                    tracing::warn!(operation, attempt, error = %err, "store still busy, giving up");
                    return Err(AppError::Unavailable);
                }
                let delay = policy.delay_after(attempt);
                tracing::info!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "store busy, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

// src/db/audit_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::audit::{AuditEntry, NewAuditEntry},
};

// `request_actions` só aceita inserção; triggers rejeitam UPDATE e DELETE.
#[derive(Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        entry: &NewAuditEntry,
        now: DateTime<Utc>,
    ) -> Result<AuditEntry, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO request_actions (
                request_id, action_type, from_status, to_status, actor_employee_id, note, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(entry.request_id)
        .bind(entry.action_type)
        .bind(entry.from_status)
        .bind(entry.to_status)
        .bind(entry.actor_employee_id)
        .bind(entry.note.as_deref())
        .bind(now)
        .fetch_one(executor)
        .await?;

        Ok(row)
    }

    /// Oldest first.
    pub async fn list_for_request(&self, request_id: i64) -> Result<Vec<AuditEntry>, AppError> {
        let rows = sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM request_actions WHERE request_id = ? ORDER BY created_at, id",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

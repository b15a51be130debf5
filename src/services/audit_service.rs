// src/services/audit_service.rs

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::AuditRepository,
    models::{
        audit::{AuditAction, AuditEntry, NewAuditEntry},
        workflow::RequestStatus,
    },
};

/// Appends to the audit trail after the triggering operation has committed.
/// A failed write is logged and swallowed: the operation still succeeds.
#[derive(Clone)]
pub struct AuditService {
    repo: AuditRepository,
}

impl AuditService {
    pub fn new(repo: AuditRepository) -> Self {
        Self { repo }
    }

    pub async fn record(
        &self,
        request_id: i64,
        action_type: AuditAction,
        from_status: Option<RequestStatus>,
        to_status: Option<RequestStatus>,
        actor_employee_id: Option<i64>,
        note: Option<&str>,
    ) -> Option<AuditEntry> {
        let entry = NewAuditEntry {
            request_id,
            action_type,
            from_status,
            to_status,
            actor_employee_id,
            note: note.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        };

        match self.repo.insert(self.repo.pool(), &entry, Utc::now()).await {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!(
                    request_id,
                    action = action_type.as_str(),
                    error = %e,
                    "audit write failed, continuing without it"
                );
                None
            }
        }
    }

    pub async fn trail(&self, request_id: i64) -> Result<Vec<AuditEntry>, AppError> {
        self.repo.list_for_request(request_id).await
    }
}

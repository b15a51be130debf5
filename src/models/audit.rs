// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::workflow::RequestStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    StatusUpdate,
    AutoComplete,
    FleetOverride,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::StatusUpdate => "STATUS_UPDATE",
            AuditAction::AutoComplete => "AUTO_COMPLETE",
            AuditAction::FleetOverride => "FLEET_OVERRIDE",
        }
    }
}

/// One row of `request_actions`. Rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub request_id: i64,
    pub action_type: AuditAction,
    pub from_status: Option<RequestStatus>,
    pub to_status: Option<RequestStatus>,
    pub actor_employee_id: Option<i64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub request_id: i64,
    pub action_type: AuditAction,
    pub from_status: Option<RequestStatus>,
    pub to_status: Option<RequestStatus>,
    pub actor_employee_id: Option<i64>,
    pub note: Option<String>,
}

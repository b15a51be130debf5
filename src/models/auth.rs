// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use validator::Validate;

// --- Papéis ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum Role {
    #[serde(rename = "EMPLOYEE")]
    #[sqlx(rename = "EMPLOYEE")]
    Employee,
    #[serde(rename = "SUPER_ADMIN")]
    #[sqlx(rename = "SUPER_ADMIN")]
    SuperAdmin,
    #[serde(rename = "IT_ADMIN")]
    #[sqlx(rename = "IT_ADMIN")]
    ItAdmin,
    #[serde(rename = "HR_ADMIN")]
    #[sqlx(rename = "HR_ADMIN")]
    HrAdmin,
    #[serde(rename = "FLEET_ADMIN")]
    #[sqlx(rename = "FLEET_ADMIN")]
    FleetAdmin,
    #[serde(rename = "IT_DEVICES_EMAIL_ADMIN")]
    #[sqlx(rename = "IT_DEVICES_EMAIL_ADMIN")]
    ItDevicesEmailAdmin,
    #[serde(rename = "IT_M365_ADMIN")]
    #[sqlx(rename = "IT_M365_ADMIN")]
    ItM365Admin,
    #[serde(rename = "IT_BI_ADMIN")]
    #[sqlx(rename = "IT_BI_ADMIN")]
    ItBiAdmin,
    #[serde(rename = "IT_ACONEX_ADMIN")]
    #[sqlx(rename = "IT_ACONEX_ADMIN")]
    ItAconexAdmin,
    #[serde(rename = "IT_AUTODESK_ADMIN")]
    #[sqlx(rename = "IT_AUTODESK_ADMIN")]
    ItAutodeskAdmin,
    #[serde(rename = "IT_P6_ADMIN")]
    #[sqlx(rename = "IT_P6_ADMIN")]
    ItP6Admin,
    #[serde(rename = "IT_RISK_ADMIN")]
    #[sqlx(rename = "IT_RISK_ADMIN")]
    ItRiskAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::ItAdmin => "IT_ADMIN",
            Role::HrAdmin => "HR_ADMIN",
            Role::FleetAdmin => "FLEET_ADMIN",
            Role::ItDevicesEmailAdmin => "IT_DEVICES_EMAIL_ADMIN",
            Role::ItM365Admin => "IT_M365_ADMIN",
            Role::ItBiAdmin => "IT_BI_ADMIN",
            Role::ItAconexAdmin => "IT_ACONEX_ADMIN",
            Role::ItAutodeskAdmin => "IT_AUTODESK_ADMIN",
            Role::ItP6Admin => "IT_P6_ADMIN",
            Role::ItRiskAdmin => "IT_RISK_ADMIN",
        }
    }

    /// Admins scoped to one downstream system, or to devices & email.
    pub fn is_scoped_it_admin(&self) -> bool {
        matches!(
            self,
            Role::ItDevicesEmailAdmin
                | Role::ItM365Admin
                | Role::ItBiAdmin
                | Role::ItAconexAdmin
                | Role::ItAutodeskAdmin
                | Role::ItP6Admin
                | Role::ItRiskAdmin
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An already-authenticated caller. Every engine operation takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub employee_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub email: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub full_name: String,
    pub department: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn actor(&self) -> Actor {
        Actor { employee_id: self.id, role: self.role }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub employee_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// Payload de login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "The email provided is invalid."))]
    #[schema(example = "jane.doe@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub token_expires_at: DateTime<Utc>,
    pub user: Employee,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub expires_at: DateTime<Utc>,
}

// src/models/workflow.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::models::auth::Role;

// --- Tipos de pedido ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    It,
    CarBooking,
    Onboarding,
    OnboardingEmail,
    OnboardingDevice,
    OnboardingSystem,
}

impl RequestType {
    pub const ALL: [RequestType; 6] = [
        RequestType::It,
        RequestType::CarBooking,
        RequestType::Onboarding,
        RequestType::OnboardingEmail,
        RequestType::OnboardingDevice,
        RequestType::OnboardingSystem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::It => "IT",
            RequestType::CarBooking => "CAR_BOOKING",
            RequestType::Onboarding => "ONBOARDING",
            RequestType::OnboardingEmail => "ONBOARDING_EMAIL",
            RequestType::OnboardingDevice => "ONBOARDING_DEVICE",
            RequestType::OnboardingSystem => "ONBOARDING_SYSTEM",
        }
    }

    /// Unknown strings yield `None`, the catalog's "no workflow" sentinel.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Child requests spawned by a composite onboarding request.
    pub fn is_onboarding_child(&self) -> bool {
        matches!(
            self,
            RequestType::OnboardingEmail | RequestType::OnboardingDevice | RequestType::OnboardingSystem
        )
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Status canônicos (projeção desnormalizada da etapa) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    InProgress,
    Booked,
    Completed,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Booked => "BOOKED",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    /// REJECTED and CANCELLED are sticky: normalization never overwrites them.
    pub fn is_absorbing(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Cancelled)
    }

    /// No ordinary transition leaves these.
    pub fn is_terminal(&self) -> bool {
        self.is_absorbing() || *self == RequestStatus::Completed
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Etapas do workflow (fonte da verdade do status) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStep {
    Submitted,
    AutoBooked,
    FleetReview,
    Triage,
    HrReview,
    InProgress,
    /// Parent onboarding while IT and system admins work the child requests.
    ItInProgress,
    Completed,
    Rejected,
    Cancelled,
}

impl WorkflowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Submitted => "SUBMITTED",
            WorkflowStep::AutoBooked => "AUTO_BOOKED",
            WorkflowStep::FleetReview => "FLEET_REVIEW",
            WorkflowStep::Triage => "TRIAGE",
            WorkflowStep::HrReview => "HR_REVIEW",
            WorkflowStep::InProgress => "IN_PROGRESS",
            WorkflowStep::ItInProgress => "IT_IN_PROGRESS",
            WorkflowStep::Completed => "COMPLETED",
            WorkflowStep::Rejected => "REJECTED",
            WorkflowStep::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Definições estáticas (compiladas, nunca persistidas) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: WorkflowStep,
    #[schema(value_type = String)]
    pub display_name: &'static str,
    pub canonical_status: RequestStatus,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[schema(value_type = Vec<Step>)]
    pub steps: &'static [Step],
    pub default_step: WorkflowStep,
    pub initial_role: Role,
}

// src/models/request.rs

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{
    auth::Role,
    vehicle::Vehicle,
    workflow::{RequestStatus, RequestType, WorkflowStep},
};

// --- Pedido (comum a todos os tipos) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[schema(example = 42)]
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub request_type: RequestType,
    #[schema(example = "Car booking to Maputo Port")]
    pub title: String,
    pub description: String,
    pub status: RequestStatus,
    pub current_step: WorkflowStep,
    pub assigned_role: Role,
    pub requester_employee_id: i64,
    pub assigned_employee_id: Option<i64>,
    pub parent_request_id: Option<i64>,
    #[schema(example = "M365")]
    pub system_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to insert a `requests` row.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub request_type: RequestType,
    pub title: String,
    pub description: String,
    pub status: RequestStatus,
    pub current_step: WorkflowStep,
    pub assigned_role: Role,
    pub requester_employee_id: i64,
    pub parent_request_id: Option<i64>,
    pub system_key: Option<String>,
}

// --- IT ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum ItCategory {
    #[serde(rename = "Support / Incident")]
    #[sqlx(rename = "Support / Incident")]
    SupportIncident,
    #[serde(rename = "Devices & Materials")]
    #[sqlx(rename = "Devices & Materials")]
    DevicesMaterials,
    #[serde(rename = "Access & Permissions")]
    #[sqlx(rename = "Access & Permissions")]
    AccessPermissions,
    #[serde(rename = "Software / License")]
    #[sqlx(rename = "Software / License")]
    SoftwareLicense,
}

impl ItCategory {
    pub const ALL: [ItCategory; 4] = [
        ItCategory::SupportIncident,
        ItCategory::DevicesMaterials,
        ItCategory::AccessPermissions,
        ItCategory::SoftwareLicense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItCategory::SupportIncident => "Support / Incident",
            ItCategory::DevicesMaterials => "Devices & Materials",
            ItCategory::AccessPermissions => "Access & Permissions",
            ItCategory::SoftwareLicense => "Software / License",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItDetail {
    #[serde(skip_serializing)]
    pub request_id: i64,
    pub category: ItCategory,
    #[schema(example = "Microsoft 365")]
    pub system_name: String,
    #[schema(example = "Normal")]
    pub impact: String,
    #[schema(example = "Normal")]
    pub urgency: String,
    #[schema(example = "LPT-0042")]
    pub asset_tag: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItRequestPayload {
    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    #[schema(example = "Laptop will not boot")]
    pub title: Option<String>,

    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    pub description: Option<String>,

    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    #[schema(example = "Support / Incident")]
    pub category: Option<String>,

    pub system_name: Option<String>,

    /// Routes access/software requests to the matching system admin.
    #[schema(example = "M365")]
    pub system_key: Option<String>,

    pub impact: Option<String>,
    pub urgency: Option<String>,
    pub asset_tag: Option<String>,
}

// --- Reserva de viatura ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarBooking {
    #[serde(skip_serializing)]
    pub request_id: i64,
    pub vehicle_id: i64,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
    pub pickup_location: String,
    #[schema(example = "Maputo Port")]
    pub destination: String,
    pub reason: String,
    #[schema(example = 3)]
    pub passengers: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: CarBooking,
    pub vehicle: Option<Vehicle>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarBookingPayload {
    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    #[schema(example = "2024-01-01T09:00")]
    pub start_datetime: Option<String>,

    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    #[schema(example = "2024-01-01T10:00")]
    pub end_datetime: Option<String>,

    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    pub destination: Option<String>,

    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    pub reason: Option<String>,

    pub pickup_location: Option<String>,

    #[validate(range(min = 1, max = 50, message = "must be between 1 and 50"))]
    pub passengers: Option<i64>,

    /// Omit to let the resolver pick the lowest-id free vehicle.
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub vehicle_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverrideBookingPayload {
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub vehicle_id: Option<i64>,
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    pub status: Option<RequestStatus>,
    pub note: Option<String>,
}

// --- Onboarding ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDetail {
    #[serde(skip_serializing)]
    pub request_id: i64,
    #[schema(example = "Ana Machava")]
    pub employee_name: String,
    #[schema(example = "Site Engineer")]
    pub position: String,
    pub department: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub device_type: String,
    pub vpn_required: bool,
    pub notes: String,
    pub email_needed: bool,
    pub device_needed: bool,
    #[sqlx(rename = "systems_json")]
    #[schema(value_type = Vec<String>, example = json!(["M365", "P6"]))]
    pub systems_requested: Json<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOnboardingPayload {
    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    pub employee_name: Option<String>,

    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    pub position: Option<String>,

    #[validate(required(message = "required"), length(min = 1, message = "required"))]
    #[schema(example = "2024-02-01")]
    pub start_date: Option<String>,

    pub department: Option<String>,
    pub location: Option<String>,
    #[schema(example = "Laptop")]
    pub device_type: Option<String>,
    pub vpn_required: Option<bool>,
    pub notes: Option<String>,
    pub email_needed: Option<bool>,
    /// Defaults to `true` when a device type is given.
    pub device_needed: Option<bool>,
    #[schema(example = json!(["M365"]))]
    pub systems_requested: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChildFailure {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub system_key: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingCreated {
    pub request: Request,
    pub onboarding: OnboardingDetail,
    pub children: Vec<Request>,
    pub children_requested: usize,
    pub children_created: usize,
    pub failures: Vec<ChildFailure>,
    #[schema(example = "Onboarding created with 3/3 child requests")]
    pub message: String,
}

// --- Leituras ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentSummary {
    pub id: i64,
    pub title: String,
    pub status: RequestStatus,
    pub current_step: WorkflowStep,
}

/// A request together with whatever detail its type carries.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    #[serde(flatten)]
    pub request: Request,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub it_detail: Option<ItDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding: Option<OnboardingDetail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Request>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentSummary>,
}

impl RequestView {
    pub fn bare(request: Request) -> Self {
        Self {
            request,
            it_detail: None,
            booking: None,
            onboarding: None,
            children: Vec::new(),
            parent: None,
        }
    }
}

/// Which slice of `requests` an actor is allowed to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestScope {
    All,
    Types(Vec<RequestType>),
    AssignedRole(Role),
    Own,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    pub scope: RequestScope,
    /// Requests filed by this employee are visible regardless of scope.
    pub requester_employee_id: i64,
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRequestsQuery {
    #[serde(rename = "type")]
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
}

// --- Transições ---

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    /// Explicit status. Wins over the step-derived one only when absorbing.
    pub status: Option<RequestStatus>,
    #[serde(alias = "workflowStatus", alias = "currentStep")]
    pub step: Option<WorkflowStep>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    #[serde(flatten)]
    pub request: Request,
    /// Set when the transition completed an onboarding child.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_status: Option<RequestStatus>,
}

// --- Entrada de data/hora ---

const DATETIME_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses `YYYY-MM-DDTHH:MM[:SS]`, dropping sub-second precision.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let value = value.split_once('.').map_or(value, |(head, _)| head);
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|dt| dt.with_nanosecond(0))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(value).map(|dt| dt.date()))
}

pub fn flexible_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_datetime(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minute_and_second_precision() {
        let a = parse_datetime("2024-01-01T09:00").unwrap();
        let b = parse_datetime("2024-01-01T09:00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.format("%F %T").to_string(), "2024-01-01 09:00:00");
    }

    #[test]
    fn drops_fractional_seconds() {
        let dt = parse_datetime("2024-01-01T09:00:30.750").unwrap();
        assert_eq!(dt.nanosecond(), 0);
        assert_eq!(dt.second(), 30);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("tomorrow morning").is_none());
        assert!(parse_date("01/02/2024").is_none());
        assert_eq!(parse_date("2024-02-01"), NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn it_category_round_trips_display_names() {
        for category in ItCategory::ALL {
            assert_eq!(ItCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(ItCategory::parse("Hardware"), None);
    }

    #[test]
    fn transition_payload_accepts_workflow_status_alias() {
        let payload: TransitionPayload =
            serde_json::from_str(r#"{"workflowStatus":"TRIAGE","note":"looking"}"#).unwrap();
        assert_eq!(payload.step, Some(WorkflowStep::Triage));
        assert_eq!(payload.status, None);
    }
}

// src/models/vehicle.rs

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::request::flexible_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Prado White")]
    pub name: String,
    #[schema(example = "M-1234")]
    pub plate_number: String,
    pub plate_code: String,
    #[schema(example = "SUV")]
    pub category: String,
    pub status: VehicleStatus,
}

/// Half-open reservation window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    /// `None` unless `start < end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        !(other.end <= self.start || other.start >= self.end)
    }
}

/// A reservation as the availability resolver sees it.
#[derive(Debug, Clone, FromRow)]
pub struct Reservation {
    pub request_id: i64,
    pub vehicle_id: i64,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
}

impl Reservation {
    pub fn interval(&self) -> Interval {
        Interval { start: self.start_datetime, end: self.end_datetime }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[schema(example = "09:00")]
    pub start_time: String,
    #[schema(example = "09:30")]
    pub end_time: String,
    pub available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotGridResponse {
    pub date: NaiveDate,
    pub vehicle_id: Option<i64>,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SlotGridQuery {
    pub date: NaiveDate,
    pub vehicle_id: Option<i64>,
}

// --- Administração da frota ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehiclePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Corolla Grey")]
    pub name: String,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "M-5678")]
    pub plate_number: String,
    pub plate_code: Option<String>,
    #[schema(example = "Sedan")]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VehicleStatusPayload {
    pub status: VehicleStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ScheduleQuery {
    #[serde(default, deserialize_with = "flexible_datetime")]
    #[param(value_type = Option<String>)]
    pub from: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "flexible_datetime")]
    #[param(value_type = Option<String>)]
    pub to: Option<NaiveDateTime>,
    pub vehicle_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub request_id: i64,
    pub title: String,
    pub status: crate::models::workflow::RequestStatus,
    pub current_step: crate::models::workflow::WorkflowStep,
    pub requester_employee_id: i64,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
    pub destination: String,
    pub reason: String,
    pub passengers: Option<i64>,
    pub vehicle_id: i64,
    pub vehicle_name: String,
    pub vehicle_plate_number: String,
}

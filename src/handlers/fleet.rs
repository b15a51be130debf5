// src/handlers/fleet.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{FleetManager, RequireRole},
    },
    models::vehicle::{CreateVehiclePayload, ScheduleEntry, ScheduleQuery, Vehicle, VehicleStatusPayload},
};

#[utoipa::path(
    get,
    path = "/api/vehicles",
    tag = "Fleet",
    responses(
        (status = 200, description = "Vehicles that can be booked", body = [Vehicle])
    ),
    security(("api_token" = []))
)]
pub async fn list_active_vehicles(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let vehicles = app_state.fleet.list_active_vehicles().await?;
    Ok(Json(vehicles))
}

#[utoipa::path(
    get,
    path = "/api/admin/vehicles",
    tag = "Fleet",
    responses(
        (status = 200, description = "The whole fleet, inactive vehicles included", body = [Vehicle])
    ),
    security(("api_token" = []))
)]
pub async fn list_vehicles(
    State(app_state): State<AppState>,
    guard: RequireRole<FleetManager>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let vehicles = app_state.fleet.list_vehicles(&guard.actor()).await?;
    Ok(Json(vehicles))
}

#[utoipa::path(
    post,
    path = "/api/admin/vehicles",
    tag = "Fleet",
    request_body = CreateVehiclePayload,
    responses(
        (status = 201, description = "Vehicle added", body = Vehicle),
        (status = 409, description = "Plate number already registered")
    ),
    security(("api_token" = []))
)]
pub async fn create_vehicle(
    State(app_state): State<AppState>,
    guard: RequireRole<FleetManager>,
    Json(payload): Json<CreateVehiclePayload>,
) -> Result<impl IntoResponse, AppError> {
    let vehicle = app_state.fleet.create_vehicle(&guard.actor(), &payload).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/vehicles/{id}/status",
    tag = "Fleet",
    params(("id" = i64, Path, description = "Vehicle id")),
    request_body = VehicleStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = Vehicle),
        (status = 404, description = "No such vehicle")
    ),
    security(("api_token" = []))
)]
pub async fn set_vehicle_status(
    State(app_state): State<AppState>,
    guard: RequireRole<FleetManager>,
    Path(id): Path<i64>,
    Json(payload): Json<VehicleStatusPayload>,
) -> Result<Json<Vehicle>, AppError> {
    let vehicle = app_state
        .fleet
        .set_vehicle_status(&guard.actor(), id, payload.status)
        .await?;
    Ok(Json(vehicle))
}

#[utoipa::path(
    get,
    path = "/api/fleet/schedule",
    tag = "Fleet",
    params(ScheduleQuery),
    responses(
        (status = 200, description = "Bookings joined with their vehicles", body = [ScheduleEntry])
    ),
    security(("api_token" = []))
)]
pub async fn fleet_schedule(
    State(app_state): State<AppState>,
    guard: RequireRole<FleetManager>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let entries = app_state.fleet.fleet_schedule(&guard.actor(), &query).await?;
    Ok(Json(entries))
}

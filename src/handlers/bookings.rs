// src/handlers/bookings.rs

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
    models::{
        request::{CreateCarBookingPayload, OverrideBookingPayload, RequestView},
        vehicle::{SlotGridQuery, SlotGridResponse},
    },
};

#[utoipa::path(
    get,
    path = "/api/car-bookings/available-slots",
    tag = "Car Bookings",
    params(SlotGridQuery),
    responses(
        (status = 200, description = "Half-hour availability grid for the day", body = SlotGridResponse),
        (status = 404, description = "Unknown vehicle")
    ),
    security(("api_token" = []))
)]
pub async fn available_slots(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<SlotGridQuery>,
) -> Result<Json<SlotGridResponse>, AppError> {
    let grid = app_state.availability.slot_grid(query.date, query.vehicle_id).await?;
    Ok(Json(grid))
}

#[utoipa::path(
    post,
    path = "/api/car-bookings",
    tag = "Car Bookings",
    request_body = CreateCarBookingPayload,
    responses(
        (status = 201, description = "Vehicle reserved", body = RequestView),
        (status = 409, description = "No vehicle free in the window")
    ),
    security(("api_token" = []))
)]
pub async fn create_car_booking(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(payload): Json<CreateCarBookingPayload>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.lifecycle.create_car_booking(actor, &payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    patch,
    path = "/api/car-bookings/{id}/override",
    tag = "Car Bookings",
    params(("id" = i64, Path, description = "Car booking request id")),
    request_body = OverrideBookingPayload,
    responses(
        (status = 200, description = "Booking changed", body = RequestView),
        (status = 409, description = "New window clashes with another booking")
    ),
    security(("api_token" = []))
)]
pub async fn override_booking(
    State(app_state): State<AppState>,
    guard: RequireRole<FleetManager>,
    Path(id): Path<i64>,
    Json(payload): Json<OverrideBookingPayload>,
) -> Result<Json<RequestView>, AppError> {
    let view = app_state.lifecycle.override_booking(guard.actor(), id, &payload).await?;
    Ok(Json(view))
}

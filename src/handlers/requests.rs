// src/handlers/requests.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        audit::AuditEntry,
        request::{
            CreateItRequestPayload, ListRequestsQuery, Request, RequestView, TransitionOutcome, TransitionPayload,
        },
    },
};

#[utoipa::path(
    post,
    path = "/api/it-requests",
    tag = "Requests",
    request_body = CreateItRequestPayload,
    responses(
        (status = 201, description = "IT request submitted and routed", body = RequestView),
        (status = 400, description = "Missing fields or unknown category")
    ),
    security(("api_token" = []))
)]
pub async fn create_it_request(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(payload): Json<CreateItRequestPayload>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.lifecycle.create_it_request(actor, &payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/requests",
    tag = "Requests",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Visible requests, newest first", body = [Request])
    ),
    security(("api_token" = []))
)]
pub async fn list_requests(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<Request>>, AppError> {
    let rows = app_state.lifecycle.list_requests(actor, &query).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    tag = "Requests",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request with its type-specific detail", body = RequestView),
        (status = 403, description = "Not visible to the caller"),
        (status = 404, description = "No such request")
    ),
    security(("api_token" = []))
)]
pub async fn get_request(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RequestView>, AppError> {
    let view = app_state.lifecycle.get_request(actor, id).await?;
    Ok(Json(view))
}

#[utoipa::path(
    patch,
    path = "/api/requests/{id}/status",
    tag = "Requests",
    params(("id" = i64, Path, description = "Request id")),
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Transition applied", body = TransitionOutcome),
        (status = 400, description = "Transition not allowed by the workflow"),
        (status = 403, description = "Caller may not make this transition"),
        (status = 409, description = "Request already finished")
    ),
    security(("api_token" = []))
)]
pub async fn transition_request(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<TransitionPayload>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let outcome = app_state.lifecycle.transition(actor, id, &payload).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}/actions",
    tag = "Requests",
    params(("id" = i64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Audit trail, oldest first", body = [AuditEntry])
    ),
    security(("api_token" = []))
)]
pub async fn list_request_actions(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let entries = app_state.lifecycle.audit_trail(actor, id).await?;
    Ok(Json(entries))
}

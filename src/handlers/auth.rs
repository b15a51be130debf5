// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::SessionToken,
    models::auth::{AuthResponse, Employee, LoginPayload, RefreshResponse},
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Session opened", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = app_state.sessions.login(&payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The signed-in employee", body = Employee),
        (status = 401, description = "Missing, unknown or expired token")
    ),
    security(("api_token" = []))
)]
pub async fn me(
    State(app_state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<Json<Employee>, AppError> {
    let employee = app_state.sessions.me(&token).await?;
    Ok(Json(employee))
}

/// Accepts a token up to the refresh grace period after it expired.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "Expiry extended", body = RefreshResponse),
        (status = 401, description = "Unknown token or grace period over")
    ),
    security(("api_token" = []))
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<Json<RefreshResponse>, AppError> {
    let response = app_state.sessions.refresh(&token).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Session closed")
    ),
    security(("api_token" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<StatusCode, AppError> {
    app_state.sessions.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

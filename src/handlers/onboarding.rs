// src/handlers/onboarding.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{OnboardingCreator, RequireRole},
    models::request::{CreateOnboardingPayload, OnboardingCreated},
};

/// Creates the parent and one child per email/device/system need. Children
/// that fail are listed in `failures`; the parent is still created.
#[utoipa::path(
    post,
    path = "/api/onboarding",
    tag = "Onboarding",
    request_body = CreateOnboardingPayload,
    responses(
        (status = 201, description = "Onboarding created", body = OnboardingCreated),
        (status = 403, description = "Only HR_ADMIN may start an onboarding")
    ),
    security(("api_token" = []))
)]
pub async fn create_onboarding(
    State(app_state): State<AppState>,
    guard: RequireRole<OnboardingCreator>,
    Json(payload): Json<CreateOnboardingPayload>,
) -> Result<impl IntoResponse, AppError> {
    let created = app_state.lifecycle.create_onboarding(guard.actor(), &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

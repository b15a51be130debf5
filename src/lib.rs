// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    let request_routes = Router::new()
        .route("/", get(handlers::requests::list_requests))
        .route("/{id}", get(handlers::requests::get_request))
        .route("/{id}/status", patch(handlers::requests::transition_request))
        .route("/{id}/actions", get(handlers::requests::list_request_actions));

    let booking_routes = Router::new()
        .route("/", post(handlers::bookings::create_car_booking))
        .route("/available-slots", get(handlers::bookings::available_slots))
        .route("/{id}/override", patch(handlers::bookings::override_booking));

    let admin_routes = Router::new()
        .route(
            "/vehicles",
            get(handlers::fleet::list_vehicles).post(handlers::fleet::create_vehicle),
        )
        .route("/vehicles/{id}/status", patch(handlers::fleet::set_vehicle_status));

    // Tudo abaixo exige uma sessão ativa
    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .nest("/api/requests", request_routes)
        .nest("/api/car-bookings", booking_routes)
        .nest("/api/admin", admin_routes)
        .route("/api/it-requests", post(handlers::requests::create_it_request))
        .route("/api/onboarding", post(handlers::onboarding::create_onboarding))
        .route("/api/vehicles", get(handlers::fleet::list_active_vehicles))
        .route("/api/fleet/schedule", get(handlers::fleet::fleet_schedule))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(handlers::workflows::health))
        .route("/api/workflows", get(handlers::workflows::list_workflows))
        .route("/api/workflows/{type}", get(handlers::workflows::get_workflow))
        .route("/api/auth/login", post(handlers::auth::login))
        // O refresh aceita tokens expirados, então fica fora do guard
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .merge(protected)
        .with_state(app_state)
}

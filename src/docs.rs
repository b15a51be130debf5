// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::refresh,
        handlers::auth::logout,

        // --- Workflows ---
        handlers::workflows::list_workflows,
        handlers::workflows::get_workflow,

        // --- Pedidos ---
        handlers::requests::create_it_request,
        handlers::requests::list_requests,
        handlers::requests::get_request,
        handlers::requests::transition_request,
        handlers::requests::list_request_actions,

        // --- Onboarding ---
        handlers::onboarding::create_onboarding,

        // --- Reservas de viatura ---
        handlers::bookings::available_slots,
        handlers::bookings::create_car_booking,
        handlers::bookings::override_booking,

        // --- Frota ---
        handlers::fleet::list_active_vehicles,
        handlers::fleet::list_vehicles,
        handlers::fleet::create_vehicle,
        handlers::fleet::set_vehicle_status,
        handlers::fleet::fleet_schedule,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::Employee,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::RefreshResponse,

            // --- Workflow ---
            models::workflow::RequestType,
            models::workflow::RequestStatus,
            models::workflow::WorkflowStep,
            models::workflow::Step,
            models::workflow::WorkflowDefinition,

            // --- Pedidos ---
            models::request::Request,
            models::request::RequestView,
            models::request::ParentSummary,
            models::request::ItCategory,
            models::request::ItDetail,
            models::request::CreateItRequestPayload,
            models::request::TransitionPayload,
            models::request::TransitionOutcome,
            models::audit::AuditAction,
            models::audit::AuditEntry,

            // --- Onboarding ---
            models::request::OnboardingDetail,
            models::request::CreateOnboardingPayload,
            models::request::OnboardingCreated,
            models::request::ChildFailure,

            // --- Reservas / frota ---
            models::request::CarBooking,
            models::request::BookingDetail,
            models::request::CreateCarBookingPayload,
            models::request::OverrideBookingPayload,
            models::vehicle::Vehicle,
            models::vehicle::VehicleStatus,
            models::vehicle::Slot,
            models::vehicle::SlotGridResponse,
            models::vehicle::CreateVehiclePayload,
            models::vehicle::VehicleStatusPayload,
            models::vehicle::ScheduleEntry,
        )
    ),
    tags(
        (name = "Auth", description = "Sessions"),
        (name = "Workflows", description = "Workflow catalog"),
        (name = "Requests", description = "IT requests, listing, transitions and audit trail"),
        (name = "Onboarding", description = "Composite onboarding requests"),
        (name = "Car Bookings", description = "Vehicle reservations"),
        (name = "Fleet", description = "Fleet administration")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_token",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

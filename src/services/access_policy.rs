// src/services/access_policy.rs
//
// Decisões puras de acesso sobre pedidos.
// Quem chama converte um `Deny` no erro adequado.

use crate::{
    common::error::AppError,
    models::{
        auth::{Actor, Role},
        request::{ListRequestsQuery, Request, RequestFilter, RequestScope},
        workflow::{RequestStatus, RequestType, WorkflowStep},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny(reason.into())
    }

    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AppError::AuthorizationError(reason)),
        }
    }
}

/// The move an actor asks for, already resolved against the catalog.
#[derive(Debug, Clone, Copy)]
pub struct DesiredChange<'a> {
    pub to_step: WorkflowStep,
    pub to_status: RequestStatus,
    pub note: Option<&'a str>,
}

/// Role designated to coordinate onboarding parents.
pub const ONBOARDING_COORDINATOR: Role = Role::ItAdmin;

fn has_note(note: Option<&str>) -> bool {
    note.is_some_and(|n| !n.trim().is_empty())
}

/// Rules are evaluated top to bottom; the first one that matches decides.
pub fn can_transition(actor: &Actor, request: &Request, change: &DesiredChange<'_>) -> Decision {
    // 1. Super admin
    if actor.role == Role::SuperAdmin {
        return Decision::Allow;
    }

    // 2. Solicitante cancelando a própria reserva
    if request.request_type == RequestType::CarBooking
        && change.to_status == RequestStatus::Cancelled
        && request.requester_employee_id == actor.employee_id
    {
        if matches!(request.status, RequestStatus::Completed | RequestStatus::Cancelled) {
            return Decision::deny(format!("Cannot cancel a booking that is already {}", request.status));
        }
        if !has_note(change.note) {
            return Decision::deny("A cancellation note is required");
        }
        return Decision::Allow;
    }

    match request.request_type {
        // 3. Pai do onboarding
        RequestType::Onboarding => {
            if actor.role == ONBOARDING_COORDINATOR {
                Decision::Allow
            } else if actor.role == Role::HrAdmin {
                Decision::deny("HR may view onboarding requests but cannot change their status")
            } else {
                Decision::deny("Only IT admins can update onboarding requests")
            }
        }
        // 4. Filhos do onboarding: só o papel atribuído
        RequestType::OnboardingEmail | RequestType::OnboardingDevice | RequestType::OnboardingSystem => {
            if actor.role == request.assigned_role {
                Decision::Allow
            } else {
                Decision::deny(format!("This request is assigned to {}", request.assigned_role))
            }
        }
        // 5. IT
        RequestType::It => {
            if actor.role == Role::ItAdmin || actor.role == request.assigned_role {
                Decision::Allow
            } else {
                Decision::deny(format!("This IT request is assigned to {}", request.assigned_role))
            }
        }
        // 6. Reservas
        RequestType::CarBooking => {
            if actor.role == Role::FleetAdmin {
                Decision::Allow
            } else {
                Decision::deny("Only fleet admins can update car bookings")
            }
        }
    }
}

pub fn can_create(actor: &Actor, request_type: RequestType) -> Decision {
    match request_type {
        RequestType::It | RequestType::CarBooking => Decision::Allow,
        RequestType::Onboarding => match actor.role {
            Role::HrAdmin | Role::SuperAdmin => Decision::Allow,
            _ => Decision::deny("Only HR admins can create onboarding requests"),
        },
        // Filhos só existem via criação de onboarding composto.
        _ => Decision::deny(format!("{request_type} requests cannot be created directly")),
    }
}

pub fn can_view(actor: &Actor, request: &Request) -> bool {
    if request.requester_employee_id == actor.employee_id {
        return true;
    }
    match actor.role {
        Role::SuperAdmin => true,
        Role::ItAdmin => request.request_type != RequestType::CarBooking,
        Role::HrAdmin => request.request_type == RequestType::Onboarding,
        Role::FleetAdmin => request.request_type == RequestType::CarBooking,
        role if role.is_scoped_it_admin() => request.assigned_role == role,
        _ => false,
    }
}

pub fn can_manage_fleet(actor: &Actor) -> bool {
    matches!(actor.role, Role::SuperAdmin | Role::FleetAdmin)
}

/// The SQL-side counterpart of [`can_view`].
pub fn list_filter(actor: &Actor, query: &ListRequestsQuery) -> RequestFilter {
    let scope = match actor.role {
        Role::SuperAdmin => RequestScope::All,
        Role::ItAdmin => RequestScope::Types(
            RequestType::ALL
                .into_iter()
                .filter(|t| *t != RequestType::CarBooking)
                .collect(),
        ),
        Role::HrAdmin => RequestScope::Types(vec![RequestType::Onboarding]),
        Role::FleetAdmin => RequestScope::Types(vec![RequestType::CarBooking]),
        role if role.is_scoped_it_admin() => RequestScope::AssignedRole(role),
        _ => RequestScope::Own,
    };

    RequestFilter {
        scope,
        requester_employee_id: actor.employee_id,
        request_type: query.request_type,
        status: query.status,
    }
}

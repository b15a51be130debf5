// src/services/workflow_catalog.rs
//
// Definições de workflow compiladas no binário. Todo status gravado em
// `requests` é derivado de uma etapa via `status_for`.

use crate::models::{
    auth::Role,
    request::ItCategory,
    workflow::{RequestStatus, RequestType, Step, WorkflowDefinition, WorkflowStep},
};

const fn step(id: WorkflowStep, display_name: &'static str, canonical_status: RequestStatus) -> Step {
    Step { id, display_name, canonical_status }
}

const IT_STEPS: [Step; 4] = [
    step(WorkflowStep::Submitted, "Submitted", RequestStatus::Pending),
    step(WorkflowStep::Triage, "Triage", RequestStatus::Approved),
    step(WorkflowStep::InProgress, "In Progress", RequestStatus::InProgress),
    step(WorkflowStep::Completed, "Completed", RequestStatus::Completed),
];

const CAR_BOOKING_STEPS: [Step; 3] = [
    step(WorkflowStep::AutoBooked, "Booked", RequestStatus::Booked),
    step(WorkflowStep::FleetReview, "Fleet Review", RequestStatus::Approved),
    step(WorkflowStep::Completed, "Completed", RequestStatus::Completed),
];

const ONBOARDING_STEPS: [Step; 4] = [
    step(WorkflowStep::Submitted, "Submitted by HR", RequestStatus::Pending),
    step(WorkflowStep::HrReview, "HR Review", RequestStatus::Approved),
    step(WorkflowStep::ItInProgress, "IT Setup In Progress", RequestStatus::InProgress),
    step(WorkflowStep::Completed, "Completed", RequestStatus::Completed),
];

const CHILD_STEPS: [Step; 3] = [
    step(WorkflowStep::Submitted, "Submitted", RequestStatus::Pending),
    step(WorkflowStep::InProgress, "In Progress", RequestStatus::InProgress),
    step(WorkflowStep::Completed, "Completed", RequestStatus::Completed),
];

/// Absorbing steps, reachable from any non-terminal step of every type.
pub const ABSORBING_STEPS: [Step; 2] = [
    step(WorkflowStep::Rejected, "Rejected", RequestStatus::Rejected),
    step(WorkflowStep::Cancelled, "Cancelled", RequestStatus::Cancelled),
];

const fn definition(request_type: RequestType, steps: &'static [Step], initial_role: Role) -> WorkflowDefinition {
    WorkflowDefinition {
        request_type,
        steps,
        default_step: steps[0].id,
        initial_role,
    }
}

static WORKFLOWS: [WorkflowDefinition; 6] = [
    // O roteamento de IT depende da categoria; IT_ADMIN é o padrão.
    definition(RequestType::It, &IT_STEPS, Role::ItAdmin),
    definition(RequestType::CarBooking, &CAR_BOOKING_STEPS, Role::FleetAdmin),
    definition(RequestType::Onboarding, &ONBOARDING_STEPS, Role::ItAdmin),
    definition(RequestType::OnboardingEmail, &CHILD_STEPS, Role::ItDevicesEmailAdmin),
    definition(RequestType::OnboardingDevice, &CHILD_STEPS, Role::ItDevicesEmailAdmin),
    // Sobrescrito pela chave do sistema na criação.
    definition(RequestType::OnboardingSystem, &CHILD_STEPS, Role::ItAdmin),
];

pub fn all() -> &'static [WorkflowDefinition] {
    &WORKFLOWS
}

pub fn workflow(request_type: RequestType) -> Option<&'static WorkflowDefinition> {
    WORKFLOWS.iter().find(|w| w.request_type == request_type)
}

/// Same as [`workflow`], keyed by the stored type string. Unknown strings have no workflow.
pub fn workflow_by_name(name: &str) -> Option<&'static WorkflowDefinition> {
    RequestType::parse(name).and_then(workflow)
}

/// Ordered, non-absorbing steps for a type.
pub fn steps_for(request_type: RequestType) -> &'static [Step] {
    workflow(request_type).map_or(&[], |w| w.steps)
}

pub fn first_step(request_type: RequestType) -> Option<&'static Step> {
    steps_for(request_type).first()
}

fn find_step(request_type: RequestType, id: WorkflowStep) -> Option<&'static Step> {
    steps_for(request_type)
        .iter()
        .chain(ABSORBING_STEPS.iter())
        .find(|s| s.id == id)
}

/// The step after `current` in the ordered sequence. `None` at the end,
/// for absorbing steps, and for steps the type does not have.
pub fn next_step(request_type: RequestType, current: WorkflowStep) -> Option<&'static Step> {
    let steps = steps_for(request_type);
    let index = steps.iter().position(|s| s.id == current)?;
    steps.get(index + 1)
}

pub fn status_for(request_type: RequestType, id: WorkflowStep) -> Option<RequestStatus> {
    find_step(request_type, id).map(|s| s.canonical_status)
}

pub fn is_absorbing_step(id: WorkflowStep) -> bool {
    ABSORBING_STEPS.iter().any(|s| s.id == id)
}

/// Whether `id` is part of the type's workflow, absorbing steps included.
pub fn has_step(request_type: RequestType, id: WorkflowStep) -> bool {
    find_step(request_type, id).is_some()
}

/// First step (in order) whose canonical status is `status`.
pub fn step_for_status(request_type: RequestType, status: RequestStatus) -> Option<WorkflowStep> {
    steps_for(request_type)
        .iter()
        .chain(ABSORBING_STEPS.iter())
        .find(|s| s.canonical_status == status)
        .map(|s| s.id)
}

/// Coordination step a composite onboarding parent jumps to once its
/// children exist.
pub const ONBOARDING_COORDINATION_STEP: WorkflowStep = WorkflowStep::ItInProgress;

// --- Roteamento ---

/// Role that handles email and device work.
pub const DEVICES_ROLE: Role = Role::ItDevicesEmailAdmin;

/// Downstream systems: key, display name, admin role.
const SYSTEMS: [(&str, &str, Role); 6] = [
    ("M365", "Microsoft 365", Role::ItM365Admin),
    ("POWER_BI", "Power BI Pro", Role::ItBiAdmin),
    ("ACONEX", "Aconex", Role::ItAconexAdmin),
    ("AUTODESK", "Autodesk", Role::ItAutodeskAdmin),
    ("P6", "Primavera P6", Role::ItP6Admin),
    ("RISK", "RiskHive", Role::ItRiskAdmin),
];

pub fn system_role(system_key: &str) -> Option<Role> {
    SYSTEMS.iter().find(|(key, _, _)| *key == system_key).map(|(_, _, role)| *role)
}

/// Display name for a system key; unknown keys are shown as-is.
pub fn system_display_name(system_key: &str) -> &str {
    SYSTEMS
        .iter()
        .find(|(key, _, _)| *key == system_key)
        .map_or(system_key, |(_, name, _)| *name)
}

/// Unknown system keys fall back to the general IT role.
pub fn system_role_or_default(system_key: &str) -> Role {
    system_role(system_key).unwrap_or(Role::ItAdmin)
}

pub fn it_assigned_role(category: ItCategory, system_key: Option<&str>) -> Role {
    match category {
        ItCategory::DevicesMaterials => DEVICES_ROLE,
        ItCategory::AccessPermissions | ItCategory::SoftwareLicense => {
            system_key.map_or(Role::ItAdmin, system_role_or_default)
        }
        ItCategory::SupportIncident => Role::ItAdmin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_a_workflow_starting_at_its_default_step() {
        for request_type in RequestType::ALL {
            let wf = workflow(request_type).expect("workflow");
            assert_eq!(wf.steps[0].id, wf.default_step);
            assert_eq!(wf.steps.last().map(|s| s.id), Some(WorkflowStep::Completed));
        }
    }

    #[test]
    fn unknown_type_names_have_no_workflow() {
        assert!(workflow_by_name("PURCHASE_ORDER").is_none());
        assert!(workflow_by_name("CAR_BOOKING").is_some());
    }

    #[test]
    fn next_step_walks_the_sequence_in_order() {
        assert_eq!(next_step(RequestType::It, WorkflowStep::Submitted).map(|s| s.id), Some(WorkflowStep::Triage));
        assert_eq!(next_step(RequestType::It, WorkflowStep::Triage).map(|s| s.id), Some(WorkflowStep::InProgress));
        assert_eq!(next_step(RequestType::It, WorkflowStep::Completed), None);
        assert_eq!(next_step(RequestType::It, WorkflowStep::Cancelled), None);
        assert_eq!(next_step(RequestType::It, WorkflowStep::AutoBooked), None);
    }

    #[test]
    fn status_for_projects_steps_to_canonical_statuses() {
        assert_eq!(status_for(RequestType::CarBooking, WorkflowStep::AutoBooked), Some(RequestStatus::Booked));
        assert_eq!(
            status_for(RequestType::Onboarding, ONBOARDING_COORDINATION_STEP),
            Some(RequestStatus::InProgress)
        );
        assert_eq!(status_for(RequestType::OnboardingSystem, WorkflowStep::Rejected), Some(RequestStatus::Rejected));
        assert_eq!(status_for(RequestType::It, WorkflowStep::HrReview), None);
    }

    #[test]
    fn absorbing_steps_belong_to_every_type() {
        for request_type in RequestType::ALL {
            assert!(has_step(request_type, WorkflowStep::Cancelled));
            assert!(has_step(request_type, WorkflowStep::Rejected));
        }
        assert!(is_absorbing_step(WorkflowStep::Rejected));
        assert!(!is_absorbing_step(WorkflowStep::Completed));
    }

    #[test]
    fn it_routing_by_category_and_system() {
        assert_eq!(it_assigned_role(ItCategory::DevicesMaterials, Some("M365")), DEVICES_ROLE);
        assert_eq!(it_assigned_role(ItCategory::AccessPermissions, Some("P6")), Role::ItP6Admin);
        assert_eq!(it_assigned_role(ItCategory::SoftwareLicense, Some("SAP")), Role::ItAdmin);
        assert_eq!(it_assigned_role(ItCategory::SoftwareLicense, None), Role::ItAdmin);
        assert_eq!(it_assigned_role(ItCategory::SupportIncident, Some("M365")), Role::ItAdmin);
    }

    #[test]
    fn system_names_fall_back_to_the_key() {
        assert_eq!(system_display_name("POWER_BI"), "Power BI Pro");
        assert_eq!(system_display_name("SAP"), "SAP");
        assert_eq!(system_role_or_default("RISK"), Role::ItRiskAdmin);
    }

    #[test]
    fn step_for_status_prefers_the_earliest_step() {
        assert_eq!(step_for_status(RequestType::CarBooking, RequestStatus::Booked), Some(WorkflowStep::AutoBooked));
        assert_eq!(step_for_status(RequestType::It, RequestStatus::Cancelled), Some(WorkflowStep::Cancelled));
        assert_eq!(step_for_status(RequestType::It, RequestStatus::Booked), None);
    }
}

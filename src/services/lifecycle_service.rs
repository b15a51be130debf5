// src/services/lifecycle_service.rs
//
// Criação, transição, decomposição e cascata. Toda escrita em vários registros
// roda numa única transação BEGIN IMMEDIATE e é repetida se o banco estiver
// ocupado. Auditoria e cascata do pai acontecem após o commit, sem garantia.

use chrono::{NaiveDate, Utc};
use sqlx::{Acquire, Sqlite, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    common::{
        db_utils::{begin_immediate, retry_on_busy, RetryPolicy},
        error::AppError,
    },
    db::{RequestRepository, VehicleRepository},
    models::{
        audit::{AuditAction, AuditEntry},
        auth::{Actor, Role},
        request::{
            parse_date, parse_datetime, BookingDetail, CarBooking, ChildFailure, CreateCarBookingPayload,
            CreateItRequestPayload, CreateOnboardingPayload, ItCategory, ListRequestsQuery, NewRequest,
            OnboardingCreated, OverrideBookingPayload, Request, RequestView, TransitionOutcome,
            TransitionPayload,
        },
        vehicle::{Interval, Vehicle},
        workflow::{RequestStatus, RequestType, WorkflowStep},
    },
    services::{
        access_policy::{self, DesiredChange},
        audit_service::AuditService,
        availability_service::AvailabilityService,
        status_normalizer::{self, StatusNormalizer},
        workflow_catalog,
    },
};

// =============================================================================
//  NORMALIZAÇÃO DA ENTRADA (pura)
// =============================================================================

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn initial_state(request_type: RequestType) -> Result<(WorkflowStep, RequestStatus), AppError> {
    let step = workflow_catalog::first_step(request_type)
        .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("no workflow for {request_type}")))?;
    Ok((step.id, step.canonical_status))
}

#[derive(Debug, Clone)]
struct ItInput {
    title: String,
    description: String,
    category: ItCategory,
    system_key: Option<String>,
    system_name: String,
    impact: String,
    urgency: String,
    asset_tag: String,
}

fn parse_it(payload: &CreateItRequestPayload) -> Result<ItInput, AppError> {
    payload.validate()?;

    let raw_category = trimmed(&payload.category);
    let category = ItCategory::parse(&raw_category).ok_or_else(|| {
        let allowed: Vec<&str> = ItCategory::ALL.iter().map(|c| c.as_str()).collect();
        AppError::ValidationError(format!("Invalid category. Must be one of: {}", allowed.join(", ")))
    })?;

    let system_key = non_empty(&payload.system_key).map(|k| k.to_uppercase());
    let system_name = non_empty(&payload.system_name).unwrap_or_else(|| {
        system_key
            .as_deref()
            .map(|k| workflow_catalog::system_display_name(k).to_string())
            .unwrap_or_default()
    });

    Ok(ItInput {
        title: trimmed(&payload.title),
        description: trimmed(&payload.description),
        category,
        system_key,
        system_name,
        impact: non_empty(&payload.impact).unwrap_or_else(|| "Normal".into()),
        urgency: non_empty(&payload.urgency).unwrap_or_else(|| "Normal".into()),
        asset_tag: trimmed(&payload.asset_tag),
    })
}

#[derive(Debug, Clone)]
struct BookingInput {
    window: Interval,
    vehicle_id: Option<i64>,
    destination: String,
    reason: String,
    pickup_location: String,
    passengers: Option<i64>,
}

fn parse_window(start: &str, end: &str) -> Result<Interval, AppError> {
    let start = parse_datetime(start).ok_or_else(|| {
        AppError::ValidationError("Invalid startDatetime. Use YYYY-MM-DDTHH:MM".into())
    })?;
    let end = parse_datetime(end)
        .ok_or_else(|| AppError::ValidationError("Invalid endDatetime. Use YYYY-MM-DDTHH:MM".into()))?;
    Interval::new(start, end)
        .ok_or_else(|| AppError::ValidationError("End time must be after start time".into()))
}

fn parse_booking(payload: &CreateCarBookingPayload) -> Result<BookingInput, AppError> {
    payload.validate()?;

    Ok(BookingInput {
        window: parse_window(&trimmed(&payload.start_datetime), &trimmed(&payload.end_datetime))?,
        vehicle_id: payload.vehicle_id,
        destination: trimmed(&payload.destination),
        reason: trimmed(&payload.reason),
        pickup_location: trimmed(&payload.pickup_location),
        passengers: payload.passengers,
    })
}

/// One child request a composite onboarding will try to create.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChildPlan {
    pub request_type: RequestType,
    pub assigned_role: Role,
    pub system_key: Option<String>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
struct OnboardingInput {
    employee_name: String,
    position: String,
    department: String,
    location: String,
    start_date: NaiveDate,
    device_type: String,
    vpn_required: bool,
    notes: String,
    email_needed: bool,
    device_needed: bool,
    systems: Vec<String>,
}

fn parse_onboarding(payload: &CreateOnboardingPayload) -> Result<OnboardingInput, AppError> {
    payload.validate()?;

    let start_date = parse_date(&trimmed(&payload.start_date))
        .ok_or_else(|| AppError::ValidationError("Invalid startDate. Use YYYY-MM-DD".into()))?;
    let device_type = trimmed(&payload.device_type);

    let mut systems: Vec<String> = Vec::new();
    for key in payload.systems_requested.iter().flatten() {
        let key = key.trim().to_uppercase();
        if !key.is_empty() && !systems.contains(&key) {
            systems.push(key);
        }
    }

    Ok(OnboardingInput {
        employee_name: trimmed(&payload.employee_name),
        position: trimmed(&payload.position),
        department: trimmed(&payload.department),
        location: trimmed(&payload.location),
        start_date,
        vpn_required: payload.vpn_required.unwrap_or(false),
        notes: trimmed(&payload.notes),
        email_needed: payload.email_needed.unwrap_or(false),
        device_needed: payload.device_needed.unwrap_or(!device_type.is_empty()),
        device_type,
        systems,
    })
}

/// Email first, then device, then one child per system in request order.
fn plan_children(input: &OnboardingInput) -> Vec<ChildPlan> {
    let name = &input.employee_name;
    let position = &input.position;
    let mut plans = Vec::new();

    if input.email_needed {
        plans.push(ChildPlan {
            request_type: RequestType::OnboardingEmail,
            assigned_role: workflow_catalog::DEVICES_ROLE,
            system_key: None,
            title: format!("Email Setup: {name}"),
            description: format!("Email account setup for {name} ({position})"),
        });
    }

    if input.device_needed {
        let device = if input.device_type.is_empty() { "Device" } else { input.device_type.as_str() };
        let vpn = if input.vpn_required { "Yes" } else { "No" };
        plans.push(ChildPlan {
            request_type: RequestType::OnboardingDevice,
            assigned_role: workflow_catalog::DEVICES_ROLE,
            system_key: None,
            title: format!("Device Setup: {device} for {name}"),
            description: format!("Device setup for {name} ({position})\nDevice: {device}\nVPN: {vpn}"),
        });
    }

    for key in &input.systems {
        let system = workflow_catalog::system_display_name(key);
        plans.push(ChildPlan {
            request_type: RequestType::OnboardingSystem,
            assigned_role: workflow_catalog::system_role_or_default(key),
            system_key: Some(key.clone()),
            title: format!("System Access: {system} for {name}"),
            description: format!("System access request for {name} ({position})\nSystem: {system}"),
        });
    }

    plans
}

/// Resolves what a transition request asks for into a concrete step and the
/// status that will be written.
///
/// - An absorbing status (REJECTED, CANCELLED) always wins and lands on its
///   absorbing step.
/// - A step must be the next step in sequence or an absorbing step.
/// - A non-absorbing explicit status must agree with the step's canonical
///   status; given alone it selects the next step carrying that status.
pub fn resolve_target(
    current: &Request,
    status: Option<RequestStatus>,
    step: Option<WorkflowStep>,
) -> Result<(WorkflowStep, RequestStatus), AppError> {
    let request_type = current.request_type;

    if current.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Request {} is already {} and cannot change",
            current.id, current.status
        )));
    }

    if let Some(status) = status.filter(RequestStatus::is_absorbing) {
        let step = workflow_catalog::step_for_status(request_type, status).ok_or_else(|| {
            AppError::InternalServerError(anyhow::anyhow!("no absorbing step for {status}"))
        })?;
        return Ok((step, status));
    }

    match step {
        Some(step) => {
            if !workflow_catalog::has_step(request_type, step) {
                return Err(AppError::ValidationError(format!(
                    "Step {step} is not part of the {request_type} workflow"
                )));
            }
            let is_next = workflow_catalog::next_step(request_type, current.current_step)
                .is_some_and(|next| next.id == step);
            if !is_next && !workflow_catalog::is_absorbing_step(step) {
                return Err(AppError::ValidationError(format!(
                    "Invalid transition for {request_type}: {} -> {step}",
                    current.current_step
                )));
            }
            let derived = workflow_catalog::status_for(request_type, step).ok_or_else(|| {
                AppError::InternalServerError(anyhow::anyhow!("no status for {request_type} step {step}"))
            })?;
            if let Some(explicit) = status {
                if explicit != derived {
                    return Err(AppError::ValidationError(format!(
                        "Status {explicit} does not match step {step} (expected {derived})"
                    )));
                }
            }
            Ok((step, derived))
        }
        None => {
            let status = status.ok_or_else(|| AppError::ValidationError("Missing required fields: status".into()))?;
            match workflow_catalog::next_step(request_type, current.current_step) {
                Some(next) if next.canonical_status == status => Ok((next.id, status)),
                _ => Err(AppError::ValidationError(format!(
                    "Invalid transition for {request_type}: {} cannot move to {status}",
                    current.current_step
                ))),
            }
        }
    }
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct LifecycleService {
    pool: SqlitePool,
    requests: RequestRepository,
    vehicles: VehicleRepository,
    availability: AvailabilityService,
    audit: AuditService,
    normalizer: StatusNormalizer,
    retry: RetryPolicy,
}

impl LifecycleService {
    pub fn new(
        pool: SqlitePool,
        requests: RequestRepository,
        vehicles: VehicleRepository,
        availability: AvailabilityService,
        audit: AuditService,
        normalizer: StatusNormalizer,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            pool,
            requests,
            vehicles,
            availability,
            audit,
            normalizer,
            retry,
        }
    }

    // --- CRIAÇÃO: IT ---

    pub async fn create_it_request(
        &self,
        actor: Actor,
        payload: &CreateItRequestPayload,
    ) -> Result<RequestView, AppError> {
        access_policy::can_create(&actor, RequestType::It).into_result()?;
        let input = parse_it(payload)?;
        let input = &input;

        let view = retry_on_busy(self.retry, "create_it_request", move || self.create_it_once(actor, input)).await?;

        tracing::info!(request_id = view.request.id, actor = actor.employee_id, role = %view.request.assigned_role, "IT request created");
        self.audit_create(&view.request, actor).await;
        Ok(view)
    }

    async fn create_it_once(&self, actor: Actor, input: &ItInput) -> Result<RequestView, AppError> {
        let (step, status) = initial_state(RequestType::It)?;
        let new = NewRequest {
            request_type: RequestType::It,
            title: input.title.clone(),
            description: input.description.clone(),
            status,
            current_step: step,
            assigned_role: workflow_catalog::it_assigned_role(input.category, input.system_key.as_deref()),
            requester_employee_id: actor.employee_id,
            parent_request_id: None,
            system_key: input.system_key.clone(),
        };

        // 1. Pedido + detalhe numa transação
        let mut tx = begin_immediate(&self.pool).await?;
        let request = self.requests.insert(&mut *tx, &new, Utc::now()).await?;
        let detail = self
            .requests
            .insert_it_detail(
                &mut *tx,
                request.id,
                input.category,
                &input.system_name,
                &input.impact,
                &input.urgency,
                &input.asset_tag,
            )
            .await?;
        tx.commit().await?;

        let mut view = RequestView::bare(request);
        view.it_detail = Some(detail);
        Ok(view)
    }

    // --- CRIAÇÃO: RESERVA DE VIATURA ---

    pub async fn create_car_booking(
        &self,
        actor: Actor,
        payload: &CreateCarBookingPayload,
    ) -> Result<RequestView, AppError> {
        access_policy::can_create(&actor, RequestType::CarBooking).into_result()?;
        let input = parse_booking(payload)?;
        let input = &input;

        let view =
            retry_on_busy(self.retry, "create_car_booking", move || self.create_booking_once(actor, input)).await?;

        tracing::info!(
            request_id = view.request.id,
            actor = actor.employee_id,
            vehicle_id = view.booking.as_ref().map(|b| b.booking.vehicle_id),
            "car booking reserved"
        );
        self.audit_create(&view.request, actor).await;
        Ok(view)
    }

    async fn create_booking_once(&self, actor: Actor, input: &BookingInput) -> Result<RequestView, AppError> {
        let (step, status) = initial_state(RequestType::CarBooking)?;

        let mut tx = begin_immediate(&self.pool).await?;

        // 1. Resolve a viatura sob o lock de escrita
        if let Some(vehicle_id) = input.vehicle_id {
            self.vehicles
                .find_by_id(&mut *tx, vehicle_id)
                .await?
                .ok_or_else(|| AppError::not_found("Vehicle", vehicle_id))?;
        }
        let vehicle = self
            .availability
            .find_available(&mut *tx, input.window, input.vehicle_id, None)
            .await?
            .ok_or_else(|| no_vehicle_conflict(input.vehicle_id.is_some()))?;

        // 2. Pedido + reserva
        let new = NewRequest {
            request_type: RequestType::CarBooking,
            title: format!("Car booking to {}", input.destination),
            description: input.reason.clone(),
            status,
            current_step: step,
            assigned_role: Role::FleetAdmin,
            requester_employee_id: actor.employee_id,
            parent_request_id: None,
            system_key: None,
        };
        let request = self.requests.insert(&mut *tx, &new, Utc::now()).await?;
        let booking = self
            .requests
            .insert_booking(
                &mut *tx,
                &CarBooking {
                    request_id: request.id,
                    vehicle_id: vehicle.id,
                    start_datetime: input.window.start,
                    end_datetime: input.window.end,
                    pickup_location: input.pickup_location.clone(),
                    destination: input.destination.clone(),
                    reason: input.reason.clone(),
                    passengers: input.passengers,
                },
            )
            .await?;

        // 3. Salva tudo
        tx.commit().await?;

        let mut view = RequestView::bare(request);
        view.booking = Some(BookingDetail { booking, vehicle: Some(vehicle) });
        Ok(view)
    }

    // --- CRIAÇÃO: ONBOARDING COMPOSTO ---

    pub async fn create_onboarding(
        &self,
        actor: Actor,
        payload: &CreateOnboardingPayload,
    ) -> Result<OnboardingCreated, AppError> {
        access_policy::can_create(&actor, RequestType::Onboarding).into_result()?;
        let input = parse_onboarding(payload)?;
        let plans = plan_children(&input);
        let (input, plans) = (&input, plans.as_slice());

        let created = retry_on_busy(self.retry, "create_onboarding", move || {
            self.create_onboarding_once(actor, input, plans)
        })
        .await?;

        tracing::info!(
            request_id = created.request.id,
            actor = actor.employee_id,
            requested = created.children_requested,
            created = created.children_created,
            "onboarding created"
        );
        self.audit_create(&created.request, actor).await;
        for child in &created.children {
            self.audit_create(child, actor).await;
        }
        Ok(created)
    }

    async fn create_onboarding_once(
        &self,
        actor: Actor,
        input: &OnboardingInput,
        plans: &[ChildPlan],
    ) -> Result<OnboardingCreated, AppError> {
        let (step, status) = initial_state(RequestType::Onboarding)?;
        let now = Utc::now();

        let mut tx = begin_immediate(&self.pool).await?;

        // 1. Pai + detalhe. Qualquer falha aqui aborta tudo.
        let parent = NewRequest {
            request_type: RequestType::Onboarding,
            title: format!("Onboarding for {}", input.employee_name),
            description: format!("Position: {} - Start: {}", input.position, input.start_date),
            status,
            current_step: step,
            assigned_role: access_policy::ONBOARDING_COORDINATOR,
            requester_employee_id: actor.employee_id,
            parent_request_id: None,
            system_key: None,
        };
        let parent = self.requests.insert(&mut *tx, &parent, now).await?;
        let detail = self
            .requests
            .insert_onboarding(
                &mut *tx,
                parent.id,
                &input.employee_name,
                &input.position,
                &input.department,
                &input.location,
                input.start_date,
                &input.device_type,
                input.vpn_required,
                &input.notes,
                input.email_needed,
                input.device_needed,
                &input.systems,
            )
            .await?;

        // 2. Filhos, cada um com seu próprio savepoint
        let mut children = Vec::with_capacity(plans.len());
        let mut failures = Vec::new();
        for plan in plans {
            match self.insert_child(&mut tx, &parent, plan, actor).await {
                Ok(child) => children.push(child),
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        parent_id = parent.id,
                        child_type = %plan.request_type,
                        system_key = plan.system_key.as_deref(),
                        error = %e,
                        "failed to create onboarding child"
                    );
                    failures.push(ChildFailure {
                        request_type: plan.request_type,
                        system_key: plan.system_key.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // 3. Um pai com filhos nunca fica em SUBMITTED
        let parent = if children.is_empty() {
            parent
        } else {
            let coordination = workflow_catalog::ONBOARDING_COORDINATION_STEP;
            let status = workflow_catalog::status_for(RequestType::Onboarding, coordination)
                .unwrap_or(RequestStatus::InProgress);
            self.requests
                .update_state(&mut *tx, parent.id, coordination, status, now)
                .await?
        };

        tx.commit().await?;

        let message = format!(
            "Onboarding created with {}/{} child requests",
            children.len(),
            plans.len()
        );
        Ok(OnboardingCreated {
            request: parent,
            onboarding: detail,
            children_requested: plans.len(),
            children_created: children.len(),
            children,
            failures,
            message,
        })
    }

    async fn insert_child(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        parent: &Request,
        plan: &ChildPlan,
        actor: Actor,
    ) -> Result<Request, AppError> {
        let (step, status) = initial_state(plan.request_type)?;
        let new = NewRequest {
            request_type: plan.request_type,
            title: plan.title.clone(),
            description: plan.description.clone(),
            status,
            current_step: step,
            assigned_role: plan.assigned_role,
            requester_employee_id: actor.employee_id,
            parent_request_id: Some(parent.id),
            system_key: plan.system_key.clone(),
        };

        let mut savepoint = (&mut **tx).begin().await?;
        let child = self.requests.insert(&mut *savepoint, &new, Utc::now()).await?;
        savepoint.commit().await?;
        Ok(child)
    }

    // --- TRANSIÇÃO ---

    pub async fn transition(
        &self,
        actor: Actor,
        request_id: i64,
        payload: &TransitionPayload,
    ) -> Result<TransitionOutcome, AppError> {
        let (before, after) = retry_on_busy(self.retry, "transition", move || {
            self.transition_once(actor, request_id, payload)
        })
        .await?;

        tracing::info!(
            request_id,
            actor = actor.employee_id,
            from = %before.current_step,
            to = %after.current_step,
            status = %after.status,
            "request transitioned"
        );
        self.audit
            .record(
                request_id,
                AuditAction::StatusUpdate,
                Some(before.status),
                Some(after.status),
                Some(actor.employee_id),
                payload.note.as_deref(),
            )
            .await;

        let parent_status = match after.parent_request_id {
            Some(parent_id)
                if after.request_type.is_onboarding_child() && after.status == RequestStatus::Completed =>
            {
                self.cascade_parent_completion(parent_id, Some(actor.employee_id)).await
            }
            _ => None,
        };

        Ok(TransitionOutcome { request: after, parent_status })
    }

    async fn transition_once(
        &self,
        actor: Actor,
        request_id: i64,
        payload: &TransitionPayload,
    ) -> Result<(Request, Request), AppError> {
        let mut tx = begin_immediate(&self.pool).await?;

        // 1. Carrega sob o lock de escrita; a etapa define o status
        let mut current = self
            .requests
            .find_by_id(&mut *tx, request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Request", request_id))?;
        if let Some(derived) = status_normalizer::reconcile(&current) {
            current.status = derived;
        }

        // 2. Resolve o destino
        let (to_step, to_status) = resolve_target(&current, payload.status, payload.step)?;
        let note = payload.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        if current.request_type == RequestType::CarBooking && to_status == RequestStatus::Cancelled && note.is_none() {
            return Err(AppError::ValidationError("A cancellation note is required".into()));
        }

        // 3. Política de acesso
        access_policy::can_transition(&actor, &current, &DesiredChange { to_step, to_status, note }).into_result()?;

        // 4. Grava
        let updated = self
            .requests
            .update_state(&mut *tx, request_id, to_step, to_status, Utc::now())
            .await?;
        tx.commit().await?;

        Ok((current, updated))
    }

    // --- CASCATA ---

    /// Completes the parent once every child is COMPLETED. Re-evaluates the
    /// whole sibling set each time; a parent that is already terminal is left
    /// alone. Failures are logged, never returned. Returns the parent's status
    /// as last seen.
    pub async fn cascade_parent_completion(&self, parent_id: i64, actor_employee_id: Option<i64>) -> Option<RequestStatus> {
        let result = retry_on_busy(self.retry, "cascade_parent_completion", move || self.cascade_once(parent_id)).await;

        match result {
            Ok((parent, Some(previous))) => {
                tracing::info!(parent_id, "all children completed, parent auto-completed");
                self.audit
                    .record(
                        parent_id,
                        AuditAction::AutoComplete,
                        Some(previous),
                        Some(parent.status),
                        actor_employee_id,
                        Some("All child requests completed"),
                    )
                    .await;
                Some(parent.status)
            }
            Ok((parent, None)) => Some(parent.status),
            Err(e) => {
                tracing::warn!(parent_id, error = %e, "parent completion check failed");
                None
            }
        }
    }

    async fn cascade_once(&self, parent_id: i64) -> Result<(Request, Option<RequestStatus>), AppError> {
        let mut tx = begin_immediate(&self.pool).await?;

        let parent = self
            .requests
            .find_by_id(&mut *tx, parent_id)
            .await?
            .ok_or_else(|| AppError::not_found("Request", parent_id))?;
        if parent.status.is_terminal() {
            return Ok((parent, None));
        }

        let children = self.requests.list_children(&mut *tx, parent_id).await?;
        let all_done = !children.is_empty() && children.iter().all(|c| c.status == RequestStatus::Completed);
        if !all_done {
            return Ok((parent, None));
        }

        let status = workflow_catalog::status_for(parent.request_type, WorkflowStep::Completed)
            .unwrap_or(RequestStatus::Completed);
        let updated = self
            .requests
            .update_state(&mut *tx, parent_id, WorkflowStep::Completed, status, Utc::now())
            .await?;
        tx.commit().await?;

        Ok((updated, Some(parent.status)))
    }

    // --- AJUSTE DA FROTA ---

    pub async fn override_booking(
        &self,
        actor: Actor,
        request_id: i64,
        payload: &OverrideBookingPayload,
    ) -> Result<RequestView, AppError> {
        if !access_policy::can_manage_fleet(&actor) {
            return Err(AppError::AuthorizationError("Only fleet admins can override bookings".into()));
        }
        payload.validate()?;
        if payload.vehicle_id.is_none()
            && payload.start_datetime.is_none()
            && payload.end_datetime.is_none()
            && payload.status.is_none()
        {
            return Err(AppError::ValidationError(
                "Nothing to override: supply vehicleId, startDatetime, endDatetime or status".into(),
            ));
        }

        let (before, view) = retry_on_busy(self.retry, "override_booking", move || {
            self.override_once(request_id, payload)
        })
        .await?;

        let booking = view.booking.as_ref().map(|b| &b.booking);
        let summary = booking.map(|b| {
            format!(
                "Fleet override: vehicle {} from {} to {}",
                b.vehicle_id,
                b.start_datetime.format("%Y-%m-%d %H:%M"),
                b.end_datetime.format("%Y-%m-%d %H:%M")
            )
        });
        let note = payload
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or(summary);

        tracing::info!(request_id, actor = actor.employee_id, status = %view.request.status, "booking overridden");
        self.audit
            .record(
                request_id,
                AuditAction::FleetOverride,
                Some(before.status),
                Some(view.request.status),
                Some(actor.employee_id),
                note.as_deref(),
            )
            .await;

        Ok(view)
    }

    async fn override_once(
        &self,
        request_id: i64,
        payload: &OverrideBookingPayload,
    ) -> Result<(Request, RequestView), AppError> {
        let mut tx = begin_immediate(&self.pool).await?;

        // 1. Estado atual
        let current = self
            .requests
            .find_by_id(&mut *tx, request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Request", request_id))?;
        if current.request_type != RequestType::CarBooking {
            return Err(AppError::ValidationError(format!("Request {request_id} is not a car booking")));
        }
        if current.status.is_absorbing() {
            return Err(AppError::Conflict(format!("Cannot override a {} booking", current.status)));
        }
        let booking = self
            .requests
            .find_booking(&mut *tx, request_id)
            .await?
            .ok_or_else(|| AppError::IntegrityError(format!("car booking request {request_id} has no booking row")))?;

        // 2. Nova reserva, conferida contra todas menos ela mesma
        let start = match payload.start_datetime.as_deref() {
            Some(raw) => parse_datetime(raw)
                .ok_or_else(|| AppError::ValidationError("Invalid startDatetime. Use YYYY-MM-DDTHH:MM".into()))?,
            None => booking.start_datetime,
        };
        let end = match payload.end_datetime.as_deref() {
            Some(raw) => parse_datetime(raw)
                .ok_or_else(|| AppError::ValidationError("Invalid endDatetime. Use YYYY-MM-DDTHH:MM".into()))?,
            None => booking.end_datetime,
        };
        let window = Interval::new(start, end)
            .ok_or_else(|| AppError::ValidationError("End time must be after start time".into()))?;
        let vehicle_id = payload.vehicle_id.unwrap_or(booking.vehicle_id);

        let vehicle: Vehicle = self
            .vehicles
            .find_by_id(&mut *tx, vehicle_id)
            .await?
            .ok_or_else(|| AppError::not_found("Vehicle", vehicle_id))?;

        let reservation_changed =
            vehicle_id != booking.vehicle_id || start != booking.start_datetime || end != booking.end_datetime;
        let booking = if reservation_changed {
            self.availability
                .find_available(&mut *tx, window, Some(vehicle_id), Some(request_id))
                .await?
                .ok_or_else(|| no_vehicle_conflict(true))?;
            self.requests
                .update_booking_reservation(&mut *tx, request_id, vehicle_id, start, end)
                .await?
        } else {
            booking
        };

        // 3. Salto de status opcional; pode pular etapas
        let request = match payload.status {
            Some(status) => {
                let step = workflow_catalog::step_for_status(RequestType::CarBooking, status).ok_or_else(|| {
                    AppError::ValidationError(format!("Status {status} is not valid for car bookings"))
                })?;
                self.requests
                    .update_state(&mut *tx, request_id, step, status, Utc::now())
                    .await?
            }
            None => current.clone(),
        };

        tx.commit().await?;

        let mut view = RequestView::bare(request);
        view.booking = Some(BookingDetail { booking, vehicle: Some(vehicle) });
        Ok((current, view))
    }

    // --- LEITURAS ---

    pub async fn get_request(&self, actor: Actor, request_id: i64) -> Result<RequestView, AppError> {
        let request = self.load_visible(actor, request_id).await?;
        let request = self.normalizer.normalize(request).await;
        let mut view = RequestView::bare(request);
        let id = view.request.id;

        match view.request.request_type {
            RequestType::It => {
                view.it_detail = Some(
                    self.requests
                        .find_it_detail(&self.pool, id)
                        .await?
                        .ok_or_else(|| missing_detail(id, "IT"))?,
                );
            }
            RequestType::CarBooking => {
                let booking = self
                    .requests
                    .find_booking(&self.pool, id)
                    .await?
                    .ok_or_else(|| missing_detail(id, "car booking"))?;
                let vehicle = self.vehicles.find_by_id(&self.pool, booking.vehicle_id).await?;
                view.booking = Some(BookingDetail { booking, vehicle });
            }
            RequestType::Onboarding => {
                view.onboarding = Some(
                    self.requests
                        .find_onboarding(&self.pool, id)
                        .await?
                        .ok_or_else(|| missing_detail(id, "onboarding"))?,
                );
                let children = self.requests.list_children(&self.pool, id).await?;
                view.children = self.normalizer.normalize_all(children).await;
            }
            RequestType::OnboardingEmail | RequestType::OnboardingDevice | RequestType::OnboardingSystem => {
                if let Some(parent_id) = view.request.parent_request_id {
                    view.parent = self.requests.find_parent_summary(&self.pool, parent_id).await?;
                }
            }
        }

        Ok(view)
    }

    pub async fn list_requests(&self, actor: Actor, query: &ListRequestsQuery) -> Result<Vec<Request>, AppError> {
        let filter = access_policy::list_filter(&actor, query);
        let rows = self.requests.list(&filter).await?;
        Ok(self.normalizer.normalize_all(rows).await)
    }

    pub async fn audit_trail(&self, actor: Actor, request_id: i64) -> Result<Vec<AuditEntry>, AppError> {
        self.load_visible(actor, request_id).await?;
        self.audit.trail(request_id).await
    }

    async fn load_visible(&self, actor: Actor, request_id: i64) -> Result<Request, AppError> {
        let request = self
            .requests
            .find_by_id(&self.pool, request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Request", request_id))?;
        if !access_policy::can_view(&actor, &request) {
            return Err(AppError::AuthorizationError("You do not have access to this request".into()));
        }
        Ok(request)
    }

    async fn audit_create(&self, request: &Request, actor: Actor) {
        self.audit
            .record(
                request.id,
                AuditAction::Create,
                None,
                Some(request.status),
                Some(actor.employee_id),
                None,
            )
            .await;
    }
}

fn no_vehicle_conflict(explicit_vehicle: bool) -> AppError {
    if explicit_vehicle {
        AppError::Conflict("Selected vehicle is not available in this time range".into())
    } else {
        AppError::Conflict("No vehicles available in this time range".into())
    }
}

fn missing_detail(request_id: i64, kind: &str) -> AppError {
    AppError::IntegrityError(format!("request {request_id} has no {kind} detail record"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(request_type: RequestType, step: WorkflowStep, status: RequestStatus) -> Request {
        Request {
            id: 1,
            request_type,
            title: "t".into(),
            description: String::new(),
            status,
            current_step: step,
            assigned_role: Role::ItAdmin,
            requester_employee_id: 1,
            assigned_employee_id: None,
            parent_request_id: None,
            system_key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn onboarding_payload() -> CreateOnboardingPayload {
        CreateOnboardingPayload {
            employee_name: Some("Ana Machava".into()),
            position: Some("Site Engineer".into()),
            start_date: Some("2024-02-01".into()),
            ..Default::default()
        }
    }

    #[test]
    fn step_alone_must_be_the_next_one() {
        let req = request(RequestType::It, WorkflowStep::Submitted, RequestStatus::Pending);
        assert_eq!(
            resolve_target(&req, None, Some(WorkflowStep::Triage)).unwrap(),
            (WorkflowStep::Triage, RequestStatus::Approved)
        );
        assert!(matches!(
            resolve_target(&req, None, Some(WorkflowStep::Completed)),
            Err(AppError::ValidationError(_))
        ));
        let err = resolve_target(&req, None, Some(WorkflowStep::AutoBooked)).unwrap_err();
        assert_eq!(err.to_string(), "Step AUTO_BOOKED is not part of the IT workflow");
    }

    #[test]
    fn status_alone_selects_the_next_matching_step() {
        let req = request(RequestType::CarBooking, WorkflowStep::AutoBooked, RequestStatus::Booked);
        assert_eq!(
            resolve_target(&req, Some(RequestStatus::Approved), None).unwrap(),
            (WorkflowStep::FleetReview, RequestStatus::Approved)
        );
        assert!(resolve_target(&req, Some(RequestStatus::Completed), None).is_err());
    }

    #[test]
    fn absorbing_status_wins_over_step() {
        let req = request(RequestType::It, WorkflowStep::Triage, RequestStatus::Approved);
        assert_eq!(
            resolve_target(&req, Some(RequestStatus::Rejected), Some(WorkflowStep::InProgress)).unwrap(),
            (WorkflowStep::Rejected, RequestStatus::Rejected)
        );
        assert_eq!(
            resolve_target(&req, None, Some(WorkflowStep::Cancelled)).unwrap(),
            (WorkflowStep::Cancelled, RequestStatus::Cancelled)
        );
    }

    #[test]
    fn explicit_status_must_agree_with_step() {
        let req = request(RequestType::It, WorkflowStep::Submitted, RequestStatus::Pending);
        assert!(matches!(
            resolve_target(&req, Some(RequestStatus::Completed), Some(WorkflowStep::Triage)),
            Err(AppError::ValidationError(_))
        ));
        assert!(resolve_target(&req, Some(RequestStatus::Approved), Some(WorkflowStep::Triage)).is_ok());
    }

    #[test]
    fn terminal_requests_do_not_move() {
        for status in [RequestStatus::Completed, RequestStatus::Cancelled, RequestStatus::Rejected] {
            let req = request(RequestType::CarBooking, WorkflowStep::Completed, status);
            assert!(matches!(
                resolve_target(&req, Some(RequestStatus::Cancelled), None),
                Err(AppError::Conflict(_))
            ));
        }
    }

    #[test]
    fn empty_transition_is_a_validation_error() {
        let req = request(RequestType::It, WorkflowStep::Submitted, RequestStatus::Pending);
        assert!(matches!(resolve_target(&req, None, None), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn composite_plan_routes_children_by_category() {
        let payload = CreateOnboardingPayload {
            email_needed: Some(true),
            device_needed: Some(true),
            systems_requested: Some(vec!["M365".into()]),
            ..onboarding_payload()
        };
        let plans = plan_children(&parse_onboarding(&payload).unwrap());
        let roles: Vec<Role> = plans.iter().map(|p| p.assigned_role).collect();
        assert_eq!(roles, vec![Role::ItDevicesEmailAdmin, Role::ItDevicesEmailAdmin, Role::ItM365Admin]);
        assert_eq!(plans[2].title, "System Access: Microsoft 365 for Ana Machava");
        assert_eq!(plans[2].system_key.as_deref(), Some("M365"));
    }

    #[test]
    fn device_type_implies_a_device_child() {
        let payload = CreateOnboardingPayload {
            device_type: Some("Laptop".into()),
            systems_requested: Some(vec!["m365".into(), "M365".into(), "SAP".into(), " ".into()]),
            ..onboarding_payload()
        };
        let plans = plan_children(&parse_onboarding(&payload).unwrap());
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].title, "Device Setup: Laptop for Ana Machava");
        assert_eq!(plans[2].assigned_role, Role::ItAdmin);
    }

    #[test]
    fn onboarding_requires_name_position_and_start_date() {
        let err = parse_onboarding(&CreateOnboardingPayload::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: employeeName, position, startDate"
        );
    }

    #[test]
    fn booking_window_must_be_ordered() {
        let payload = CreateCarBookingPayload {
            start_datetime: Some("2024-01-01T10:00".into()),
            end_datetime: Some("2024-01-01T09:00".into()),
            destination: Some("Port".into()),
            reason: Some("Site visit".into()),
            ..Default::default()
        };
        let err = parse_booking(&payload).unwrap_err();
        assert_eq!(err.to_string(), "End time must be after start time");
    }

    #[test]
    fn it_category_is_checked_against_the_known_list() {
        let payload = CreateItRequestPayload {
            title: Some("Printer".into()),
            description: Some("Jammed".into()),
            category: Some("Hardware".into()),
            ..Default::default()
        };
        let err = parse_it(&payload).unwrap_err();
        assert!(err.to_string().starts_with("Invalid category"));
    }
}

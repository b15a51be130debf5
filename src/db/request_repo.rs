// src/db/request_repo.rs

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{types::Json, Executor, QueryBuilder, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::{
        request::{
            CarBooking, ItCategory, ItDetail, NewRequest, OnboardingDetail, ParentSummary, Request,
            RequestFilter, RequestScope,
        },
        workflow::{RequestStatus, WorkflowStep},
    },
};

/// Rows of `requests` and the per-type detail tables keyed by `request_id`.
#[derive(Clone)]
pub struct RequestRepository {
    pool: SqlitePool,
}

impl RequestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PEDIDOS
    // =========================================================================

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        new: &NewRequest,
        now: DateTime<Utc>,
    ) -> Result<Request, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let request = sqlx::query_as::<_, Request>(
            r#"
            INSERT INTO requests (
                type, title, description, status, current_step, assigned_role,
                requester_employee_id, parent_request_id, system_key, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(new.request_type)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.status)
        .bind(new.current_step)
        .bind(new.assigned_role)
        .bind(new.requester_employee_id)
        .bind(new.parent_request_id)
        .bind(new.system_key.as_deref())
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await?;

        Ok(request)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<Request>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let request = sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(request)
    }

    /// Moves a request to `step` and writes the status projected from it.
    pub async fn update_state<'e, E>(
        &self,
        executor: E,
        id: i64,
        step: WorkflowStep,
        status: RequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Request, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let request = sqlx::query_as::<_, Request>(
            r#"
            UPDATE requests
            SET current_step = ?, status = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(step)
        .bind(status)
        .bind(now)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Request", id))?;

        Ok(request)
    }

    /// Rewrites a drifted status. Only applies while the row still holds
    /// `expected` at `step`, so a concurrent transition is never clobbered.
    pub async fn correct_status<'e, E>(
        &self,
        executor: E,
        id: i64,
        step: WorkflowStep,
        expected: RequestStatus,
        corrected: RequestStatus,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE requests
            SET status = ?
            WHERE id = ? AND current_step = ? AND status = ?
              AND status NOT IN ('REJECTED', 'CANCELLED')
            "#,
        )
        .bind(corrected)
        .bind(id)
        .bind(step)
        .bind(expected)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list_children<'e, E>(&self, executor: E, parent_id: i64) -> Result<Vec<Request>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let children = sqlx::query_as::<_, Request>(
            "SELECT * FROM requests WHERE parent_request_id = ? ORDER BY id",
        )
        .bind(parent_id)
        .fetch_all(executor)
        .await?;

        Ok(children)
    }

    pub async fn find_parent_summary<'e, E>(
        &self,
        executor: E,
        parent_id: i64,
    ) -> Result<Option<ParentSummary>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let parent = sqlx::query_as::<_, ParentSummary>(
            "SELECT id, title, status, current_step FROM requests WHERE id = ?",
        )
        .bind(parent_id)
        .fetch_optional(executor)
        .await?;

        Ok(parent)
    }

    /// Newest first. The scope is ORed with "filed by me".
    pub async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, AppError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM requests WHERE (");

        match &filter.scope {
            RequestScope::All => {
                qb.push("1 = 1");
            }
            RequestScope::Types(types) => {
                qb.push("type IN (");
                let mut separated = qb.separated(", ");
                for request_type in types {
                    separated.push_bind(*request_type);
                }
                separated.push_unseparated(")");
            }
            RequestScope::AssignedRole(role) => {
                qb.push("assigned_role = ").push_bind(*role);
            }
            RequestScope::Own => {
                qb.push("0 = 1");
            }
        }
        qb.push(" OR requester_employee_id = ")
            .push_bind(filter.requester_employee_id)
            .push(")");

        if let Some(request_type) = filter.request_type {
            qb.push(" AND type = ").push_bind(request_type);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb.build_query_as::<Request>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // =========================================================================
    //  REGISTROS DE DETALHE
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_it_detail<'e, E>(
        &self,
        executor: E,
        request_id: i64,
        category: ItCategory,
        system_name: &str,
        impact: &str,
        urgency: &str,
        asset_tag: &str,
    ) -> Result<ItDetail, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let detail = sqlx::query_as::<_, ItDetail>(
            r#"
            INSERT INTO it_requests (request_id, category, system_name, impact, urgency, asset_tag)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(category)
        .bind(system_name)
        .bind(impact)
        .bind(urgency)
        .bind(asset_tag)
        .fetch_one(executor)
        .await?;

        Ok(detail)
    }

    pub async fn find_it_detail<'e, E>(&self, executor: E, request_id: i64) -> Result<Option<ItDetail>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let detail = sqlx::query_as::<_, ItDetail>("SELECT * FROM it_requests WHERE request_id = ?")
            .bind(request_id)
            .fetch_optional(executor)
            .await?;

        Ok(detail)
    }

    pub async fn insert_booking<'e, E>(&self, executor: E, booking: &CarBooking) -> Result<CarBooking, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let booking = sqlx::query_as::<_, CarBooking>(
            r#"
            INSERT INTO car_bookings (
                request_id, vehicle_id, start_datetime, end_datetime,
                pickup_location, destination, reason, passengers
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(booking.request_id)
        .bind(booking.vehicle_id)
        .bind(booking.start_datetime)
        .bind(booking.end_datetime)
        .bind(&booking.pickup_location)
        .bind(&booking.destination)
        .bind(&booking.reason)
        .bind(booking.passengers)
        .fetch_one(executor)
        .await?;

        Ok(booking)
    }

    pub async fn find_booking<'e, E>(&self, executor: E, request_id: i64) -> Result<Option<CarBooking>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let booking = sqlx::query_as::<_, CarBooking>("SELECT * FROM car_bookings WHERE request_id = ?")
            .bind(request_id)
            .fetch_optional(executor)
            .await?;

        Ok(booking)
    }

    pub async fn update_booking_reservation<'e, E>(
        &self,
        executor: E,
        request_id: i64,
        vehicle_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<CarBooking, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let booking = sqlx::query_as::<_, CarBooking>(
            r#"
            UPDATE car_bookings
            SET vehicle_id = ?, start_datetime = ?, end_datetime = ?
            WHERE request_id = ?
            RETURNING *
            "#,
        )
        .bind(vehicle_id)
        .bind(start)
        .bind(end)
        .bind(request_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::IntegrityError(format!("car booking request {request_id} has no booking row")))?;

        Ok(booking)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_onboarding<'e, E>(
        &self,
        executor: E,
        request_id: i64,
        employee_name: &str,
        position: &str,
        department: &str,
        location: &str,
        start_date: NaiveDate,
        device_type: &str,
        vpn_required: bool,
        notes: &str,
        email_needed: bool,
        device_needed: bool,
        systems: &[String],
    ) -> Result<OnboardingDetail, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let detail = sqlx::query_as::<_, OnboardingDetail>(
            r#"
            INSERT INTO onboarding_requests (
                request_id, employee_name, position, department, location, start_date,
                device_type, vpn_required, notes, email_needed, device_needed, systems_json
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(employee_name)
        .bind(position)
        .bind(department)
        .bind(location)
        .bind(start_date)
        .bind(device_type)
        .bind(vpn_required)
        .bind(notes)
        .bind(email_needed)
        .bind(device_needed)
        .bind(Json(systems))
        .fetch_one(executor)
        .await?;

        Ok(detail)
    }

    pub async fn find_onboarding<'e, E>(
        &self,
        executor: E,
        request_id: i64,
    ) -> Result<Option<OnboardingDetail>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let detail =
            sqlx::query_as::<_, OnboardingDetail>("SELECT * FROM onboarding_requests WHERE request_id = ?")
                .bind(request_id)
                .fetch_optional(executor)
                .await?;

        Ok(detail)
    }
}

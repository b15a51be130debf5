// src/db/vehicle_repo.rs

use chrono::NaiveDateTime;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::error::AppError,
    models::vehicle::{Interval, Reservation, ScheduleEntry, Vehicle, VehicleStatus},
};

#[derive(Clone)]
pub struct VehicleRepository {
    pool: SqlitePool,
}

impl VehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn list(&self, only_active: bool) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE (? = 0 OR status = 'ACTIVE') ORDER BY id",
        )
        .bind(only_active)
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<Vehicle>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(vehicle)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        plate_number: &str,
        plate_code: &str,
        category: &str,
    ) -> Result<Vehicle, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (name, plate_number, plate_code, category, status)
            VALUES (?, ?, ?, ?, 'ACTIVE')
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(plate_number)
        .bind(plate_code)
        .bind(category)
        .fetch_one(executor)
        .await?;

        Ok(vehicle)
    }

    pub async fn set_status(&self, id: i64, status: VehicleStatus) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>("UPDATE vehicles SET status = ? WHERE id = ? RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    pub async fn count<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Lowest-id ACTIVE vehicle with no live booking overlapping `window`.
    /// Cancelled and rejected bookings no longer hold their vehicle.
    /// `exclude_request_id` ignores one booking, so an override can re-check
    /// its own reservation.
    pub async fn find_available<'e, E>(
        &self,
        executor: E,
        window: Interval,
        vehicle_id: Option<i64>,
        exclude_request_id: Option<i64>,
    ) -> Result<Option<Vehicle>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT v.*
            FROM vehicles v
            WHERE v.status = 'ACTIVE'
              AND (?1 IS NULL OR v.id = ?1)
              AND NOT EXISTS (
                  SELECT 1
                  FROM car_bookings cb
                  JOIN requests r ON r.id = cb.request_id
                  WHERE cb.vehicle_id = v.id
                    AND r.status NOT IN ('CANCELLED', 'REJECTED')
                    AND (?4 IS NULL OR cb.request_id <> ?4)
                    AND NOT (cb.end_datetime <= ?2 OR cb.start_datetime >= ?3)
              )
            ORDER BY v.id
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .bind(window.start)
        .bind(window.end)
        .bind(exclude_request_id)
        .fetch_optional(executor)
        .await?;

        Ok(vehicle)
    }

    /// Live reservations touching `[from, to)`, optionally for one vehicle.
    pub async fn reservations_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        vehicle_id: Option<i64>,
    ) -> Result<Vec<Reservation>, AppError> {
        let rows = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT cb.request_id, cb.vehicle_id, cb.start_datetime, cb.end_datetime
            FROM car_bookings cb
            JOIN requests r ON r.id = cb.request_id
            WHERE r.status NOT IN ('CANCELLED', 'REJECTED')
              AND NOT (cb.end_datetime <= ?1 OR cb.start_datetime >= ?2)
              AND (?3 IS NULL OR cb.vehicle_id = ?3)
            ORDER BY cb.start_datetime
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn schedule(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
        vehicle_id: Option<i64>,
    ) -> Result<Vec<ScheduleEntry>, AppError> {
        let rows = sqlx::query_as::<_, ScheduleEntry>(
            r#"
            SELECT
                r.id AS request_id, r.title, r.status, r.current_step, r.requester_employee_id,
                cb.start_datetime, cb.end_datetime, cb.destination, cb.reason, cb.passengers,
                v.id AS vehicle_id, v.name AS vehicle_name, v.plate_number AS vehicle_plate_number
            FROM car_bookings cb
            JOIN requests r ON r.id = cb.request_id
            JOIN vehicles v ON v.id = cb.vehicle_id
            WHERE (?1 IS NULL OR cb.end_datetime > ?1)
              AND (?2 IS NULL OR cb.start_datetime < ?2)
              AND (?3 IS NULL OR cb.vehicle_id = ?3)
            ORDER BY cb.start_datetime, v.name
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

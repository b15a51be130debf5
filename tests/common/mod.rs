// tests/common/mod.rs
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use request_hub::{
    config::{AppState, Config},
    db::{self, EmployeeRepository, VehicleRepository},
    models::{
        auth::{Actor, Role},
        request::{CreateCarBookingPayload, CreateOnboardingPayload, TransitionPayload},
        vehicle::Vehicle,
        workflow::{RequestStatus, WorkflowStep},
    },
};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    // Dropping the directory deletes the database file.
    _dir: TempDir,
    pub pool: SqlitePool,
    pub state: AppState,
}

pub async fn setup() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        database_url: format!("sqlite://{}", dir.path().join("hub.db").display()),
        db_max_connections: 8,
        store_retry_attempts: 5,
        store_retry_base_ms: 10,
        ..Config::default()
    };

    let pool = db::connect(&config).await.expect("connect");
    db::run_migrations(&pool).await.expect("migrations");
    let state = AppState::from_pool(pool.clone(), config);

    TestApp { _dir: dir, pool, state }
}

impl TestApp {
    /// Inserts an active employee with [`PASSWORD`] and returns it as an actor.
    pub async fn employee(&self, email: &str, role: Role) -> Actor {
        // Low cost keeps the suite fast; verification reads the cost from the hash.
        let password_hash = bcrypt::hash(PASSWORD, 4).expect("hash");
        EmployeeRepository::new(self.pool.clone())
            .create(&self.pool, email, &password_hash, email, "Ops", role)
            .await
            .expect("employee")
            .actor()
    }

    pub async fn vehicle(&self, name: &str, plate: &str) -> Vehicle {
        VehicleRepository::new(self.pool.clone())
            .create(&self.pool, name, plate, plate, "SUV")
            .await
            .expect("vehicle")
    }

    pub async fn raw_status(&self, request_id: i64) -> (String, String) {
        sqlx::query_as("SELECT status, current_step FROM requests WHERE id = ?")
            .bind(request_id)
            .fetch_one(&self.pool)
            .await
            .expect("request row")
    }
}

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 3, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid datetime")
}

pub fn booking(start: &str, end: &str, vehicle_id: Option<i64>) -> CreateCarBookingPayload {
    CreateCarBookingPayload {
        start_datetime: Some(start.into()),
        end_datetime: Some(end.into()),
        destination: Some("Maputo Port".into()),
        reason: Some("Site inspection".into()),
        passengers: Some(2),
        vehicle_id,
        ..Default::default()
    }
}

pub fn onboarding(systems: &[&str]) -> CreateOnboardingPayload {
    CreateOnboardingPayload {
        employee_name: Some("Ana Machava".into()),
        position: Some("Site Engineer".into()),
        start_date: Some("2030-04-01".into()),
        department: Some("Engineering".into()),
        email_needed: Some(true),
        device_type: Some("Laptop".into()),
        systems_requested: Some(systems.iter().map(|s| s.to_string()).collect()),
        ..Default::default()
    }
}

pub fn to_step(step: WorkflowStep) -> TransitionPayload {
    TransitionPayload { step: Some(step), ..Default::default() }
}

pub fn to_status(status: RequestStatus, note: Option<&str>) -> TransitionPayload {
    TransitionPayload {
        status: Some(status),
        note: note.map(str::to_string),
        ..Default::default()
    }
}

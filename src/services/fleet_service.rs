// src/services/fleet_service.rs

use validator::Validate;

use crate::{
    common::error::AppError,
    db::VehicleRepository,
    models::{
        auth::Actor,
        vehicle::{CreateVehiclePayload, ScheduleEntry, ScheduleQuery, Vehicle, VehicleStatus},
    },
    services::access_policy,
};

/// name, plate, plate code, category
const DEMO_VEHICLES: [(&str, &str, &str, &str); 3] = [
    ("Prado White", "M-1234", "PRADO-W", "SUV"),
    ("Corolla Grey", "M-5678", "COROLLA-G", "Sedan"),
    ("Hilux Pickup", "M-9012", "HILUX-P", "Pickup"),
];

#[derive(Clone)]
pub struct FleetService {
    vehicles: VehicleRepository,
}

impl FleetService {
    pub fn new(vehicles: VehicleRepository) -> Self {
        Self { vehicles }
    }

    fn require_fleet(actor: &Actor) -> Result<(), AppError> {
        if access_policy::can_manage_fleet(actor) {
            Ok(())
        } else {
            Err(AppError::AuthorizationError("Fleet administration requires FLEET_ADMIN".into()))
        }
    }

    pub async fn list_active_vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        self.vehicles.list(true).await
    }

    pub async fn list_vehicles(&self, actor: &Actor) -> Result<Vec<Vehicle>, AppError> {
        Self::require_fleet(actor)?;
        self.vehicles.list(false).await
    }

    pub async fn create_vehicle(&self, actor: &Actor, payload: &CreateVehiclePayload) -> Result<Vehicle, AppError> {
        Self::require_fleet(actor)?;
        payload.validate()?;

        let plate_number = payload.plate_number.trim();
        let plate_code = payload
            .plate_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(plate_number);
        let category = payload.category.as_deref().map(str::trim).unwrap_or_default();

        let vehicle = self
            .vehicles
            .create(self.vehicles.pool(), payload.name.trim(), plate_number, plate_code, category)
            .await?;

        tracing::info!(vehicle_id = vehicle.id, actor = actor.employee_id, plate = %vehicle.plate_number, "vehicle added to fleet");
        Ok(vehicle)
    }

    /// Deactivating a vehicle keeps its existing bookings; it just stops
    /// being offered for new ones.
    pub async fn set_vehicle_status(
        &self,
        actor: &Actor,
        vehicle_id: i64,
        status: VehicleStatus,
    ) -> Result<Vehicle, AppError> {
        Self::require_fleet(actor)?;

        let vehicle = self
            .vehicles
            .set_status(vehicle_id, status)
            .await?
            .ok_or_else(|| AppError::not_found("Vehicle", vehicle_id))?;

        tracing::info!(vehicle_id, actor = actor.employee_id, status = ?status, "vehicle status changed");
        Ok(vehicle)
    }

    pub async fn fleet_schedule(&self, actor: &Actor, query: &ScheduleQuery) -> Result<Vec<ScheduleEntry>, AppError> {
        Self::require_fleet(actor)?;
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if to <= from {
                return Err(AppError::ValidationError("'to' must be after 'from'".into()));
            }
        }
        self.vehicles.schedule(query.from, query.to, query.vehicle_id).await
    }

    /// Inserts the demo fleet when the vehicle table is empty. Returns how many
    /// vehicles were added.
    pub async fn seed_demo_vehicles(&self) -> Result<usize, AppError> {
        let mut tx = self.vehicles.pool().begin().await?;
        if self.vehicles.count(&mut *tx).await? > 0 {
            return Ok(0);
        }

        for (name, plate_number, plate_code, category) in DEMO_VEHICLES {
            self.vehicles
                .create(&mut *tx, name, plate_number, plate_code, category)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(count = DEMO_VEHICLES.len(), "demo vehicles seeded");
        Ok(DEMO_VEHICLES.len())
    }
}

// tests/fleet.rs

mod common;

use common::setup;
use request_hub::{
    common::error::AppError,
    models::{
        auth::Role,
        vehicle::{CreateVehiclePayload, VehicleStatus},
    },
};

fn vehicle_payload(name: &str, plate: &str, plate_code: Option<&str>) -> CreateVehiclePayload {
    CreateVehiclePayload {
        name: name.into(),
        plate_number: plate.into(),
        plate_code: plate_code.map(str::to_string),
        category: Some("SUV".into()),
    }
}

#[tokio::test]
async fn fleet_admin_manages_vehicles() {
    let app = setup().await;
    let fleet = app.employee("fleet@example.com", Role::FleetAdmin).await;
    let employee = app.employee("joao@example.com", Role::Employee).await;
    let service = &app.state.fleet;

    let err = service
        .create_vehicle(&employee, &vehicle_payload("Prado White", "M-1234", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AuthorizationError(_)));

    let prado = service
        .create_vehicle(&fleet, &vehicle_payload(" Prado White ", "M-1234", None))
        .await
        .unwrap();
    assert_eq!(prado.name, "Prado White");
    assert_eq!(prado.plate_code, "M-1234");
    assert_eq!(prado.status, VehicleStatus::Active);

    let err = service
        .create_vehicle(&fleet, &vehicle_payload("Another Prado", "M-1234", Some("PRADO-2")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let corolla = service
        .create_vehicle(&fleet, &vehicle_payload("Corolla Grey", "M-5678", Some("COROLLA-G")))
        .await
        .unwrap();
    service
        .set_vehicle_status(&fleet, corolla.id, VehicleStatus::Inactive)
        .await
        .unwrap();

    let active: Vec<i64> = service.list_active_vehicles().await.unwrap().iter().map(|v| v.id).collect();
    assert_eq!(active, vec![prado.id]);
    assert_eq!(service.list_vehicles(&fleet).await.unwrap().len(), 2);
    assert!(service.list_vehicles(&employee).await.is_err());

    let err = service
        .set_vehicle_status(&fleet, 999, VehicleStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn demo_fleet_is_seeded_only_into_an_empty_table() {
    let app = setup().await;
    let service = &app.state.fleet;

    assert_eq!(service.seed_demo_vehicles().await.unwrap(), 3);
    assert_eq!(service.seed_demo_vehicles().await.unwrap(), 0);

    let names: Vec<String> = service
        .list_active_vehicles()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(names, vec!["Prado White", "Corolla Grey", "Hilux Pickup"]);
}

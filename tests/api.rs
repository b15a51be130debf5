// tests/api.rs

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::{setup, TestApp, PASSWORD};
use request_hub::{build_router, models::auth::Role};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        json_request("POST", "/api/auth/login", None, json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().expect("token").to_string()
}

async fn router_with(app: &TestApp, users: &[(&str, Role)]) -> Router {
    for (email, role) in users {
        app.employee(email, *role).await;
    }
    build_router(app.state.clone())
}

#[tokio::test]
async fn public_routes_need_no_session() {
    let app = setup().await;
    let router = build_router(app.state.clone());

    let (status, body) = send(&router, get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));

    let (status, body) = send(&router, get("/api/workflows", None)).await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|w| w["type"].as_str())
        .collect();
    assert!(types.contains(&"CAR_BOOKING"));
    assert!(types.contains(&"ONBOARDING"));

    let (status, body) = send(&router, get("/api/workflows/CAR_BOOKING", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "CAR_BOOKING");
    assert_eq!(body["defaultStep"], "AUTO_BOOKED");

    let (status, body) = send(&router, get("/api/workflows/PURCHASE_ORDER", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No workflow for request type PURCHASE_ORDER");
}

#[tokio::test]
async fn login_me_and_logout() {
    let app = setup().await;
    let router = router_with(&app, &[("joao@example.com", Role::Employee)]).await;

    let (status, body) = send(
        &router,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "joao@example.com", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let token = login(&router, "joao@example.com").await;
    let (status, body) = send(&router, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "joao@example.com");
    assert_eq!(body["role"], "EMPLOYEE");
    assert!(body.get("passwordHash").is_none());

    let (status, _) = send(&router, json_request("POST", "/api/auth/logout", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_reject_missing_tokens() {
    let app = setup().await;
    let router = build_router(app.state.clone());

    let (status, body) = send(&router, get("/api/requests", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&router, get("/api/requests", Some("not-a-real-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn validation_errors_come_back_as_400_with_an_error_field() {
    let app = setup().await;
    let router = router_with(&app, &[("joao@example.com", Role::Employee)]).await;
    let token = login(&router, "joao@example.com").await;

    let (status, body) = send(
        &router,
        json_request("POST", "/api/it-requests", Some(&token), json!({ "title": "Printer" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields: category, description" }));
}

#[tokio::test]
async fn booking_flow_over_http() {
    let app = setup().await;
    let router = router_with(
        &app,
        &[("joao@example.com", Role::Employee), ("fleet@example.com", Role::FleetAdmin)],
    )
    .await;
    let vehicle = app.vehicle("Toyota Hilux", "ABC-123-MP").await;
    let employee = login(&router, "joao@example.com").await;
    let fleet = login(&router, "fleet@example.com").await;

    let booking = json!({
        "startDatetime": "2030-03-04T09:00",
        "endDatetime": "2030-03-04T11:00",
        "destination": "Maputo Port",
        "reason": "Site inspection"
    });
    let (status, body) = send(&router, json_request("POST", "/api/car-bookings", Some(&employee), booking.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "BOOKED");
    assert_eq!(body["booking"]["vehicleId"], vehicle.id);
    let request_id = body["id"].as_i64().unwrap();

    // The only vehicle is taken for that window.
    let (status, body) = send(&router, json_request("POST", "/api/car-bookings", Some(&employee), booking)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "No vehicles available in this time range");

    // Fleet screens are guarded by role.
    let (status, _) = send(&router, get("/api/admin/vehicles", Some(&employee))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&router, get("/api/admin/vehicles", Some(&fleet))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, body) = send(
        &router,
        json_request(
            "PATCH",
            &format!("/api/requests/{request_id}/status"),
            Some(&fleet),
            json!({ "workflowStatus": "FLEET_REVIEW" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "APPROVED");

    let (status, body) = send(&router, get(&format!("/api/requests/{request_id}/actions"), Some(&employee))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, body) = send(
        &router,
        get(
            &format!("/api/car-bookings/available-slots?date=2030-03-04&vehicleId={}", vehicle.id),
            Some(&employee),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn onboarding_endpoint_is_hr_only() {
    let app = setup().await;
    let router = router_with(
        &app,
        &[("joao@example.com", Role::Employee), ("hr@example.com", Role::HrAdmin)],
    )
    .await;
    let employee = login(&router, "joao@example.com").await;
    let hr = login(&router, "hr@example.com").await;

    let payload = json!({
        "employeeName": "Ana Machava",
        "position": "Site Engineer",
        "startDate": "2030-04-01",
        "emailNeeded": true,
        "systemsRequested": ["m365"]
    });

    let (status, _) = send(&router, json_request("POST", "/api/onboarding", Some(&employee), payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&router, json_request("POST", "/api/onboarding", Some(&hr), payload)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["childrenCreated"], 2);
    assert_eq!(body["message"], "Onboarding created with 2/2 child requests");
}

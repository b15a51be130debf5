// tests/sessions.rs

mod common;

use chrono::{Duration, Utc};
use common::{setup, PASSWORD};
use request_hub::{
    common::error::AppError,
    db::EmployeeRepository,
    models::auth::{LoginPayload, Role},
};

fn credentials(email: &str, password: &str) -> LoginPayload {
    LoginPayload { email: email.into(), password: password.into() }
}

async fn backdate(pool: &sqlx::SqlitePool, token: &str, by: Duration) {
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE token = ?")
        .bind(Utc::now() - by)
        .bind(token)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn login_resolves_to_the_employee_actor() {
    let app = setup().await;
    let actor = app.employee("joao@example.com", Role::FleetAdmin).await;
    let sessions = &app.state.sessions;

    let response = sessions.login(&credentials("JOAO@example.com", PASSWORD)).await.unwrap();
    assert_eq!(response.user.id, actor.employee_id);
    assert!(response.token_expires_at > Utc::now());

    let resolved = app.state.identity.resolve(&response.token).await.unwrap();
    assert_eq!(resolved, actor);
}

#[tokio::test]
async fn bad_password_and_inactive_accounts_are_rejected() {
    let app = setup().await;
    let actor = app.employee("joao@example.com", Role::Employee).await;
    let sessions = &app.state.sessions;

    let err = sessions.login(&credentials("joao@example.com", "nope")).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));

    let token = sessions.login(&credentials("joao@example.com", PASSWORD)).await.unwrap().token;
    EmployeeRepository::new(app.pool.clone())
        .set_active(actor.employee_id, false)
        .await
        .unwrap();

    let err = sessions.login(&credentials("joao@example.com", PASSWORD)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    // Deactivation also cuts existing sessions.
    let err = app.state.identity.resolve(&token).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidToken));
}

#[tokio::test]
async fn expired_tokens_can_be_refreshed_within_the_grace_period() {
    let app = setup().await;
    app.employee("joao@example.com", Role::Employee).await;
    let sessions = &app.state.sessions;

    let token = sessions.login(&credentials("joao@example.com", PASSWORD)).await.unwrap().token;
    backdate(&app.pool, &token, Duration::minutes(5)).await;

    assert!(matches!(app.state.identity.resolve(&token).await, Err(AppError::InvalidToken)));
    let refreshed = sessions.refresh(&token).await.unwrap();
    assert!(refreshed.expires_at > Utc::now());
    assert!(app.state.identity.resolve(&token).await.is_ok());

    // Past the grace period the token is gone for good.
    backdate(&app.pool, &token, Duration::hours(3)).await;
    assert!(matches!(sessions.refresh(&token).await, Err(AppError::InvalidToken)));
    assert_eq!(sessions.purge_expired().await.unwrap(), 1);
    assert!(matches!(sessions.refresh(&token).await, Err(AppError::InvalidToken)));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let app = setup().await;
    app.employee("joao@example.com", Role::Employee).await;
    let sessions = &app.state.sessions;

    let token = sessions.login(&credentials("joao@example.com", PASSWORD)).await.unwrap().token;
    sessions.logout(&token).await.unwrap();
    sessions.logout(&token).await.unwrap();

    assert!(matches!(sessions.me(&token).await, Err(AppError::InvalidToken)));
}

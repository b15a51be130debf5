// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::auth::{Actor, Role},
};

/// 1. What a guarded route requires of the caller's role
pub trait RoleGuard: Send + Sync + 'static {
    fn allowed_roles() -> &'static [Role];
    fn description() -> &'static str;
}

/// 2. The extractor. Runs after `auth_guard` and yields the actor on success.
pub struct RequireRole<G>(pub Actor, PhantomData<G>);

impl<G> RequireRole<G> {
    pub fn actor(&self) -> Actor {
        self.0
    }
}

impl<G, S> FromRequestParts<S> for RequireRole<G>
where
    G: RoleGuard,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(actor) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if actor.role != Role::SuperAdmin && !G::allowed_roles().contains(&actor.role) {
            tracing::debug!(actor = actor.employee_id, role = %actor.role, guard = G::description(), "role guard denied");
            return Err(AppError::AuthorizationError(format!(
                "This action requires {}",
                G::description()
            )));
        }

        Ok(RequireRole(actor, PhantomData))
    }
}

// --- Guardiões ---

pub struct FleetManager;

impl RoleGuard for FleetManager {
    fn allowed_roles() -> &'static [Role] {
        &[Role::FleetAdmin]
    }

    fn description() -> &'static str {
        "FLEET_ADMIN"
    }
}

pub struct OnboardingCreator;

impl RoleGuard for OnboardingCreator {
    fn allowed_roles() -> &'static [Role] {
        &[Role::HrAdmin]
    }

    fn description() -> &'static str {
        "HR_ADMIN"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract<G: RoleGuard>(actor: Option<Actor>) -> Result<RequireRole<G>, AppError> {
        let (mut parts, _) = Request::new(()).into_parts();
        if let Some(actor) = actor {
            parts.extensions.insert(AuthenticatedUser(actor));
        }
        RequireRole::<G>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn guard_admits_listed_roles_and_super_admin() {
        let fleet = Actor { employee_id: 1, role: Role::FleetAdmin };
        let root = Actor { employee_id: 2, role: Role::SuperAdmin };
        assert!(extract::<FleetManager>(Some(fleet)).await.is_ok());
        assert!(extract::<FleetManager>(Some(root)).await.is_ok());
    }

    #[tokio::test]
    async fn guard_rejects_other_roles_and_anonymous_calls() {
        let employee = Actor { employee_id: 3, role: Role::Employee };
        assert!(matches!(
            extract::<OnboardingCreator>(Some(employee)).await,
            Err(AppError::AuthorizationError(_))
        ));
        assert!(matches!(extract::<FleetManager>(None).await, Err(AppError::InvalidToken)));
    }
}

// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{common::error::AppError, config::AppState, models::auth::Actor};

/// The caller resolved by [`auth_guard`].
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Actor);

/// The raw bearer token, kept for the session endpoints.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

fn bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolves `Authorization: Bearer <token>` through the identity provider and
/// stores the actor in the request extensions.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::InvalidToken)?;
    let actor = app_state.identity.resolve(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(actor));
    request.extensions_mut().insert(SessionToken(token));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AppError::InvalidToken)
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(token) = parts.extensions.get::<SessionToken>() {
            return Ok(token.clone());
        }
        // O refresh roda fora do guard: lá um token expirado ainda é aceito.
        bearer_token(&parts.headers).map(SessionToken).ok_or(AppError::InvalidToken)
    }
}

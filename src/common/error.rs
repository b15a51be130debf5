// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::common::db_utils::is_busy;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input. Reported verbatim, never retried.
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    AuthorizationError(String),

    #[error("{0}")]
    NotFound(String),

    /// Business-rule failure, e.g. no vehicle free for the window.
    #[error("{0}")]
    Conflict(String),

    /// The store rejected the transaction under contention. Retried internally.
    #[error("Store is busy")]
    StoreBusy(#[source] sqlx::Error),

    /// Contention outlived every retry.
    #[error("Service temporarily unavailable. Please try again.")]
    Unavailable,

    #[error("Integrity violation: {0}")]
    IntegrityError(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired session token")]
    InvalidToken,

    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),
}

impl AppError {
    pub fn not_found(what: &str, id: i64) -> Self {
        AppError::NotFound(format!("{what} {id} not found"))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::StoreBusy(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_busy(&err) {
            return AppError::StoreBusy(err);
        }
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::IntegrityError(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Duplicate value: {}", db.message()))
            }
            _ => AppError::DatabaseError(err),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut missing = Vec::new();
        let mut invalid = Vec::new();
        for (field, field_errors) in fields {
            let name = camel_case(&field);
            let is_missing = field_errors
                .iter()
                .any(|e| e.code == "required" || e.message.as_deref() == Some("required"));
            if is_missing {
                missing.push(name);
                continue;
            }
            let reasons: Vec<String> = field_errors
                .iter()
                .map(|e| e.message.as_ref().map_or_else(|| e.code.to_string(), |m| m.to_string()))
                .collect();
            invalid.push(format!("{name} ({})", reasons.join(", ")));
        }

        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("Missing required fields: {}", missing.join(", ")));
        }
        if !invalid.is_empty() {
            parts.push(format!("Invalid fields: {}", invalid.join("; ")));
        }
        AppError::ValidationError(parts.join(". "))
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::InvalidCredentials | AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::StoreBusy(_) | AppError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                AppError::Unavailable.to_string(),
            ),
            AppError::IntegrityError(ref detail) => {
                tracing::error!(detail = %detail, "integrity violation, operation rolled back");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Data integrity violation. The operation was rolled back.".to_string(),
                )
            }
            ref e => {
                tracing::error!(error = ?e, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(required(message = "required"), length(min = 1, message = "required"))]
        start_datetime: Option<String>,
        #[validate(required(message = "required"), length(min = 1, message = "required"))]
        destination: Option<String>,
        #[validate(range(min = 1, max = 50, message = "must be between 1 and 50"))]
        passengers: Option<i64>,
    }

    #[test]
    fn missing_fields_are_listed_in_camel_case() {
        let sample = Sample { start_datetime: None, destination: Some(String::new()), passengers: None };
        let err = AppError::from(sample.validate().unwrap_err());
        assert_eq!(
            err.to_string(),
            "Missing required fields: destination, startDatetime"
        );
    }

    #[test]
    fn rule_failures_are_reported_with_their_message() {
        let sample = Sample {
            start_datetime: Some("2024-01-01T09:00".into()),
            destination: Some("Port".into()),
            passengers: Some(90),
        };
        let err = AppError::from(sample.validate().unwrap_err());
        assert_eq!(err.to_string(), "Invalid fields: passengers (must be between 1 and 50)");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(AppError::from(sqlx::Error::RowNotFound), AppError::NotFound(_)));
        assert!(AppError::from(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (AppError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (AppError::AuthorizationError("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (AppError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AppError::IntegrityError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}

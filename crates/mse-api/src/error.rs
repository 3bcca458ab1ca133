//! API error handling
//!
//! Every failure renders as
//! `{"_type":"Error","errorIdentifier":..,"message":..,"errors":{..}}`,
//! except admin-only pages, which redirect to the login page instead.

use std::collections::BTreeMap;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mse_core::error::{MseError, ValidationErrors};
use serde::Serialize;

/// Login page that admin-only routes send rejected callers to
pub const LOGIN_PATH: &str = "/login";

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(ValidationErrors),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
    /// 303 to the given location
    Redirect(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    /// Redirect to the login page carrying an error code
    pub fn login_redirect(error_code: &str) -> Self {
        ApiError::Redirect(format!("{}?error={}", LOGIN_PATH, error_code))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Redirect(_) => StatusCode::SEE_OTHER,
        }
    }

    fn identifier(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "urn:medsyneval:errors:NotFound",
            ApiError::Validation(_) => "urn:medsyneval:errors:PropertyConstraintViolation",
            ApiError::Unauthorized(_) => "urn:medsyneval:errors:Unauthenticated",
            ApiError::Forbidden(_) => "urn:medsyneval:errors:MissingPermission",
            ApiError::BadRequest(_) => "urn:medsyneval:errors:InvalidRequestBody",
            ApiError::Conflict(_) => "urn:medsyneval:errors:Conflict",
            ApiError::Internal(_) | ApiError::Redirect(_) => "urn:medsyneval:errors:InternalError",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "_type")]
    type_name: &'static str,
    #[serde(rename = "errorIdentifier")]
    error_identifier: &'static str,
    message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    errors: BTreeMap<String, Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_identifier = self.identifier();

        let (message, errors) = match self {
            ApiError::Redirect(location) => {
                return (status, [(header::LOCATION, location)]).into_response();
            }
            ApiError::Validation(errors) => {
                let message = errors.full_messages().join(", ");
                let mut fields = errors.fields;
                if !errors.base.is_empty() {
                    fields.insert("base".into(), errors.base);
                }
                (message, fields)
            }
            ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => (msg, BTreeMap::new()),
        };

        let body = ErrorBody {
            type_name: "Error",
            error_identifier,
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

impl From<MseError> for ApiError {
    fn from(err: MseError) -> Self {
        match err {
            MseError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            MseError::Unauthorized { message } => ApiError::Unauthorized(message),
            MseError::Forbidden { message } => ApiError::Forbidden(message),
            MseError::Validation(errors) => ApiError::Validation(errors),
            MseError::Conflict { message } => ApiError::Conflict(message),
            MseError::Database(_) | MseError::Internal(_) => {
                tracing::error!(error = %err, "request failed");
                ApiError::Internal("An internal error occurred".into())
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err: ApiError = MseError::conflict("This image has already been evaluated").into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: ApiError = MseError::invalid("confidence", "must be between 1 and 5").into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = MseError::Database("connection reset".into()).into();
        assert!(matches!(err, ApiError::Internal(ref m) if !m.contains("connection")));
    }

    #[test]
    fn test_login_redirect() {
        let response = ApiError::login_redirect("admin_required").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?error=admin_required"
        );
    }
}

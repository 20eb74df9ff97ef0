/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`. Domain errors from the shared crate
/// convert into [`ApiError::Domain`], carrying their stable `operation.reason`
/// code into the response body and their kind into the status code.
///
/// # Response body
///
/// ```json
/// {
///   "error": "createTask.invalidDeadline",
///   "message": "Deadline must be a valid time in the future"
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tasker_shared::{
    auth::middleware::AuthError,
    calendar::CalendarError,
    error::{DomainError, ErrorCode, ErrorKind},
    services::{connections::ConnectionError, tasks::TaskError, users::UserError},
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Code reported for request bodies rejected by `validator`
pub const VALIDATION_CODE: ErrorCode = ErrorCode::new("request", "validation");

/// Code reported for unexpected failures outside the domain layer
pub const INTERNAL_CODE: ErrorCode = ErrorCode::new("internal", "unexpected");

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// A domain failure with its stable code
    Domain {
        status: StatusCode,
        code: ErrorCode,
        message: String,
    },

    /// Request body failed validation (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code, `operation.reason`
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// HTTP status for a domain error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    /// Converts any domain error, hiding the message of internal failures
    pub fn from_domain<E: DomainError>(err: &E) -> Self {
        let kind = err.kind();
        let message = if kind == ErrorKind::Internal {
            tracing::error!(code = %err.code(), error = %err, "Internal error");
            "An internal error occurred".to_string()
        } else {
            err.to_string()
        };

        ApiError::Domain {
            status: status_for(kind),
            code: err.code(),
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain { status, .. } => *status,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Domain { code, message, .. } => write!(f, "{}: {}", code, message),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Domain { code, message, .. } => ErrorResponse {
                error: code.to_string(),
                message,
                details: None,
            },
            ApiError::ValidationError(errors) => ErrorResponse {
                error: VALIDATION_CODE.to_string(),
                message: "Request validation failed".to_string(),
                details: Some(errors),
            },
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ErrorResponse {
                    error: INTERNAL_CODE.to_string(),
                    message: "An internal error occurred".to_string(),
                    details: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        ApiError::from_domain(&err)
    }
}

impl From<ConnectionError> for ApiError {
    fn from(err: ConnectionError) -> Self {
        ApiError::from_domain(&err)
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        ApiError::from_domain(&err)
    }
}

impl From<CalendarError> for ApiError {
    fn from(err: CalendarError) -> Self {
        ApiError::from_domain(&err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::from_domain(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasker_shared::services::tasks::TaskOp;

    #[test]
    fn test_domain_error_maps_kind_to_status() {
        let err: ApiError = TaskError::InvalidDeadline(TaskOp::Create).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "createTask.invalidDeadline: Deadline must be a valid time in the future"
        );

        let err: ApiError = TaskError::NoPermission(TaskOp::Get).into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err: ApiError = ConnectionError::ConnectionExists.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = AuthError::MissingCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let err: ApiError = TaskError::Database(sqlx::Error::PoolTimedOut).into();
        match err {
            ApiError::Domain { status, code, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(code, ErrorCode::DATABASE);
                assert!(!message.contains("pool"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

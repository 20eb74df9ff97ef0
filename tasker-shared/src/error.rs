/// Error codes shared by every domain component
///
/// Each component (connections, tasks, users, calendar) defines its own closed
/// error enum. Those enums implement [`DomainError`], which exposes:
///
/// - a stable, machine-readable [`ErrorCode`] of the form `operation.reason`
///   (for example `createTask.invalidDeadline`)
/// - an [`ErrorKind`] the HTTP layer maps onto a status code
///
/// The human-readable message is the error's `Display` output.
///
/// # Example
///
/// ```
/// use tasker_shared::error::ErrorCode;
///
/// let code = ErrorCode::new("createTask", "invalidDeadline");
/// assert_eq!(code.to_string(), "createTask.invalidDeadline");
/// ```

use serde::{Serialize, Serializer};
use std::fmt;

/// Stable `(operation, reason)` pair identifying a domain failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Operation that failed (camelCase, e.g. `editTask`)
    pub operation: &'static str,

    /// Reason within that operation (camelCase, e.g. `noPermission`)
    pub reason: &'static str,
}

impl ErrorCode {
    pub const fn new(operation: &'static str, reason: &'static str) -> Self {
        Self { operation, reason }
    }

    /// Code used for storage failures, which are never attributed to an operation
    pub const DATABASE: ErrorCode = ErrorCode::new("internal", "database");
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.operation, self.reason)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Coarse classification of a domain failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input has the wrong shape or is out of range
    Validation,

    /// Caller is not authenticated, or presented bad credentials
    Unauthenticated,

    /// Caller is authenticated but not allowed to do this
    Forbidden,

    /// Referenced entity does not exist
    NotFound,

    /// Entity already exists
    Conflict,

    /// Required collaborator is not configured
    Unavailable,

    /// Storage or other unexpected failure
    Internal,
}

/// Implemented by every component error enum
pub trait DomainError: std::error::Error {
    /// Stable machine-readable code
    fn code(&self) -> ErrorCode;

    /// Classification used for HTTP status mapping
    fn kind(&self) -> ErrorKind;
}

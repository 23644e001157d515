//! Error types and HTTP response conversion

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::audit_log::ActionKind;
use crate::employee::EmployeeId;

// ============================================================================
// Record store errors
// ============================================================================

/// Record store operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Establishing or checking a connection
    Connect,
    /// Loading a record
    Find,
    /// Inserting a record
    Add,
    /// Overwriting a record
    Update,
    /// Deleting a record
    Remove,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Find => write!(f, "find"),
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Category of record store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Failed to establish connection
    ConnectionFailed,
    /// Connection pool exhausted or timed out
    PoolExhausted,
    /// Constraint violation (unique, not null, check)
    ConstraintViolation,
    /// Query execution failed
    QueryFailed,
    /// Column could not be decoded into the entity
    TypeConversion,
    /// Configuration error
    Configuration,
    /// Other/unknown error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::PoolExhausted => write!(f, "pool_exhausted"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::TypeConversion => write!(f, "type_conversion"),
            Self::Configuration => write!(f, "configuration"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured record store error with operation context
///
/// Keeps the driver error as its [`source`](std::error::Error::source) and
/// the backtrace of the point where it was created.
#[derive(Debug, Clone)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    source: Option<Arc<sqlx::Error>>,
    backtrace: Arc<Backtrace>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            source: None,
            backtrace: Arc::new(Backtrace::force_capture()),
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::Connect,
            StoreErrorKind::ConnectionFailed,
            message,
        )
    }

    /// Attach the driver error that caused this one
    pub fn with_source(mut self, source: sqlx::Error) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Re-tag the error with the operation that produced it
    pub fn during(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the error means the store could not be reached at all
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::PoolExhausted
        )
    }

    /// Stack at the point the error was created
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Record store {} error during {}: {}",
            self.kind, self.operation, self.message
        )
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        let mapped = match &err {
            E::PoolTimedOut => Self::new(
                StoreOperation::Connect,
                StoreErrorKind::PoolExhausted,
                "Connection pool timed out",
            ),
            E::PoolClosed => Self::connection_failed("Connection pool is closed"),
            E::Io(e) => Self::connection_failed(e.to_string()),
            E::Tls(e) => Self::connection_failed(format!("TLS error: {}", e)),
            E::WorkerCrashed => Self::connection_failed("Database worker crashed"),
            E::Configuration(e) => Self::new(
                StoreOperation::Connect,
                StoreErrorKind::Configuration,
                e.to_string(),
            ),
            E::ColumnDecode { index, source } => Self::new(
                StoreOperation::Find,
                StoreErrorKind::TypeConversion,
                format!("Failed to decode column {}: {}", index, source),
            ),
            E::Decode(e) => Self::new(
                StoreOperation::Find,
                StoreErrorKind::TypeConversion,
                e.to_string(),
            ),
            E::Database(db_err) => {
                let kind = if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation()
                {
                    StoreErrorKind::ConstraintViolation
                } else {
                    StoreErrorKind::QueryFailed
                };
                Self::new(StoreOperation::Find, kind, db_err.to_string())
            }
            other => Self::new(
                StoreOperation::Find,
                StoreErrorKind::Other,
                other.to_string(),
            ),
        };
        mapped.with_source(err)
    }
}

// ============================================================================
// Audit log store errors
// ============================================================================

/// Errors raised by the audit log table store
#[derive(Debug, Error)]
pub enum AuditLogError {
    /// Could not obtain a connection to the table store
    #[error("Audit log store unavailable: {0}")]
    Unavailable(String),

    /// Command sent to the table store failed
    #[error("Audit log store command failed: {0}")]
    Command(#[from] redis::RedisError),

    /// Entry could not be (de)serialized
    #[error("Audit log entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<deadpool_redis::PoolError> for AuditLogError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        AuditLogError::Unavailable(err.to_string())
    }
}

// ============================================================================
// Service error
// ============================================================================

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Required field missing or blank, or a body that does not bind
    #[error("{0}")]
    Validation(String),

    /// Request body over the configured limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Employee id not present in the record store
    #[error("Not found")]
    NotFound,

    /// Record store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Audit log store failure outside of a mutation
    #[error(transparent)]
    AuditLog(#[from] AuditLogError),

    /// The record store mutation committed but the audit entry was not written
    #[error("{action} of employee {employee_id} committed but audit log write failed: {source}")]
    AuditLogAfterCommit {
        action: ActionKind,
        employee_id: EmployeeId,
        department: String,
        #[source]
        source: AuditLogError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,

    /// Set when the record store mutation is durable despite the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed: Option<bool>,

    /// Employee affected by a partially failed mutation
    #[serde(rename = "employeeId", skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<EmployeeId>,
}

impl ErrorResponse {
    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
            committed: None,
            employee_id: None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;

        let body = match self {
            Error::Validation(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),

            Error::PayloadTooLarge(msg) => {
                return (StatusCode::PAYLOAD_TOO_LARGE, msg).into_response()
            }

            Error::NotFound => return StatusCode::NOT_FOUND.into_response(),

            Error::Config(e) => {
                ErrorResponse::with_code(status, "CONFIG_ERROR", e.to_string())
            }

            Error::Store(e) => {
                tracing::error!(
                    operation = %e.operation,
                    kind = %e.kind,
                    "Record store error: {}", e.message
                );
                let code = format!("STORE_{}", e.kind.to_string().to_uppercase());
                ErrorResponse::with_code(status, code, "Record store operation failed")
            }

            Error::AuditLog(e) => {
                tracing::error!("Audit log error: {}", e);
                ErrorResponse::with_code(status, "AUDIT_LOG_ERROR", "Audit log operation failed")
            }

            Error::AuditLogAfterCommit {
                action,
                employee_id,
                department,
                source,
            } => {
                tracing::error!(
                    %action,
                    employee_id,
                    department = %department,
                    error = %source,
                    "Record store mutation committed without audit log entry"
                );
                ErrorResponse {
                    committed: Some(true),
                    employee_id: Some(employee_id),
                    ..ErrorResponse::with_code(
                        status,
                        "AUDIT_LOG_WRITE_FAILED",
                        format!("{} committed but the audit log entry was not written", action),
                    )
                }
            }

            Error::Io(e) => {
                tracing::error!("I/O error: {}", e);
                ErrorResponse::with_code(status, "IO_ERROR", "I/O operation failed")
            }

            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse::with_code(status, "INTERNAL_ERROR", "Internal server error")
            }
        };

        (status, Json(body)).into_response()
    }
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Store(StoreError::from(err))
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        tracing::warn!(status = %rejection.status(), "Rejected request body: {}", message);

        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge(message)
        } else {
            Error::Validation(message)
        }
    }
}

//! Connection diagnostics for `GET /Funcionario/TestConnection`
//!
//! Reports whether the record store answers and whether the audit log store
//! is configured. An error raised by the check itself is returned as a 500
//! carrying the error message, its source and the backtrace taken where the
//! error was raised.
//!
//! The backtrace exposes internals and should not be reachable in production
//! deployments.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

use crate::config::AuditLogConfig;
use crate::error::StoreError;
use crate::state::AppState;

/// How many leading characters of the connection string are reported
const CONNECTION_STRING_PREFIX_LEN: usize = 30;

/// Successful diagnostic payload
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub sql_database: SqlDatabaseStatus,
    pub table_storage: TableStorageStatus,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlDatabaseStatus {
    pub connected: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStorageStatus {
    pub has_connection_string: bool,
    pub has_table_name: bool,
    pub table_name: Option<String>,
    pub connection_string_prefix: String,
}

impl TableStorageStatus {
    fn from_config(config: &AuditLogConfig) -> Self {
        Self {
            has_connection_string: config.connection_string().is_some(),
            has_table_name: config.table_name().is_some(),
            table_name: config.table_name.clone(),
            connection_string_prefix: connection_string_prefix(config.connection_string()),
        }
    }
}

/// Error payload returned with a 500
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticFailure {
    pub error: String,
    pub inner_error: Option<String>,
    pub stack_trace: String,
}

impl DiagnosticFailure {
    fn from_store_error(err: &StoreError) -> Self {
        Self {
            error: err.to_string(),
            inner_error: err.source().map(|source| source.to_string()),
            stack_trace: err.backtrace().to_string(),
        }
    }
}

/// First characters of the connection string followed by `...`
pub fn connection_string_prefix(connection_string: Option<&str>) -> String {
    match connection_string {
        Some(value) => {
            let prefix: String = value.chars().take(CONNECTION_STRING_PREFIX_LEN).collect();
            format!("{}...", prefix)
        }
        None => "Not configured".to_string(),
    }
}

/// Run the connectivity checks
///
/// An unreachable record store is reported as `connected: false`; any other
/// record store error is returned.
pub async fn check_connections(state: &AppState) -> Result<ConnectionReport, StoreError> {
    let connected = state.employees().can_connect().await?;

    Ok(ConnectionReport {
        sql_database: SqlDatabaseStatus {
            connected,
            message: if connected {
                "SQL connection successful".to_string()
            } else {
                "SQL connection failed".to_string()
            },
        },
        table_storage: TableStorageStatus::from_config(&state.config().audit_log),
    })
}

/// `GET /Funcionario/TestConnection`
pub async fn test_connection(State(state): State<AppState>) -> Response {
    match check_connections(&state).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            tracing::error!("Connection diagnostics failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DiagnosticFailure::from_store_error(&err)),
            )
                .into_response()
        }
    }
}

//! Employee HTTP API
//!
//! Every mutation runs as two steps: the record store write, then the audit
//! log write. The second step is not transactional with the first. When it
//! fails the mutation stays committed and the request fails with
//! [`Error::AuditLogAfterCommit`], which tells the caller the change is
//! durable but missing from the audit trail.

use axum::{
    extract::{FromRequest, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::audit_log::{ActionKind, AuditLogEntry};
use crate::diagnostics;
use crate::employee::{Employee, EmployeeId, UNASSIGNED_ID};
use crate::error::{Error, Result};
use crate::health;
use crate::responses::{Created, NoContent};
use crate::state::AppState;

/// Base route of the employee resource
pub const BASE_PATH: &str = "/Funcionario";

/// Full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .nest(BASE_PATH, employee_routes())
        .with_state(state)
}

fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/Logs", get(list_logs))
        .route("/Logs/{departamento}", get(list_logs_by_department))
        .route("/TestConnection", get(diagnostics::test_connection))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

/// JSON employee body; binding failures answer 400 like validation failures
#[derive(FromRequest, serde::Deserialize)]
#[from_request(via(Json), rejection(Error))]
struct EmployeeBody(Employee);

fn validate(employee: &Employee) -> Result<()> {
    employee.validate().map_err(|msg| {
        tracing::warn!("Rejected employee: {}", msg);
        Error::Validation(msg.to_string())
    })
}

async fn load(state: &AppState, id: EmployeeId) -> Result<Employee> {
    state.employees().find(id).await?.ok_or_else(|| {
        tracing::warn!(id, "Employee not found");
        Error::NotFound
    })
}

/// Post-commit step: write the audit entry for a committed mutation
async fn record_mutation(state: &AppState, employee: &Employee, action: ActionKind) -> Result<()> {
    let entry = AuditLogEntry::new(employee, action);
    let row_key = entry.row_key.clone();

    state
        .audit_log()
        .upsert(entry)
        .await
        .map_err(|source| Error::AuditLogAfterCommit {
            action,
            employee_id: employee.id,
            department: employee.department().to_string(),
            source,
        })?;

    tracing::info!(
        %action,
        id = employee.id,
        department = employee.department(),
        row_key = %row_key,
        "Audit log entry recorded"
    );
    Ok(())
}

/// `GET /Funcionario/{id}`
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<EmployeeId>,
) -> Result<Json<Employee>> {
    Ok(Json(load(&state, id).await?))
}

/// `POST /Funcionario`
async fn create(
    State(state): State<AppState>,
    EmployeeBody(mut employee): EmployeeBody,
) -> Result<Created<Employee>> {
    validate(&employee)?;

    // ids are always assigned by the store
    employee.id = UNASSIGNED_ID;
    let created = state.employees().add(employee).await?;
    tracing::info!(id = created.id, department = created.department(), "Employee created");

    record_mutation(&state, &created, ActionKind::Insertion).await?;

    let location = format!("{}/{}", BASE_PATH, created.id);
    Ok(Created::new(created).with_location(location))
}

/// `PUT /Funcionario/{id}`
async fn update(
    State(state): State<AppState>,
    Path(id): Path<EmployeeId>,
    EmployeeBody(employee): EmployeeBody,
) -> Result<StatusCode> {
    validate(&employee)?;

    let mut stored = load(&state, id).await?;
    stored.overwrite_from(employee);
    state.employees().update(&stored).await?;
    tracing::info!(id, department = stored.department(), "Employee updated");

    record_mutation(&state, &stored, ActionKind::Update).await?;

    Ok(StatusCode::OK)
}

/// `DELETE /Funcionario/{id}`
async fn delete(State(state): State<AppState>, Path(id): Path<EmployeeId>) -> Result<NoContent> {
    let snapshot = load(&state, id).await?;
    state.employees().remove(id).await?;
    tracing::info!(id, department = snapshot.department(), "Employee removed");

    record_mutation(&state, &snapshot, ActionKind::Removal).await?;

    Ok(NoContent)
}

/// `GET /Funcionario/Logs`
async fn list_logs(State(state): State<AppState>) -> Result<Json<Vec<AuditLogEntry>>> {
    Ok(Json(state.audit_log().query_all().await?))
}

/// `GET /Funcionario/Logs/{departamento}`
async fn list_logs_by_department(
    State(state): State<AppState>,
    Path(department): Path<String>,
) -> Result<Json<Vec<AuditLogEntry>>> {
    Ok(Json(state.audit_log().query_by_partition(&department).await?))
}

//! PostgreSQL record store
//!
//! Expects the table below to exist; schema management is handled outside
//! this service.
//!
//! ```sql
//! CREATE TABLE funcionarios (
//!     id                 SERIAL PRIMARY KEY,
//!     nome               TEXT,
//!     endereco           TEXT,
//!     ramal              TEXT,
//!     email_profissional TEXT,
//!     departamento       TEXT,
//!     salario            DOUBLE PRECISION NOT NULL DEFAULT 0,
//!     data_admissao      TIMESTAMP
//! );
//! ```

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use super::{EmployeeStore, StoreResult};
use crate::config::DatabaseConfig;
use crate::employee::{Employee, EmployeeId};
use crate::error::{Error, Result, StoreError, StoreOperation};

const COLUMNS: &str =
    "id, nome, endereco, ramal, email_profissional, departamento, salario, data_admissao";

/// Employee store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgEmployeeStore {
    pool: PgPool,
}

impl PgEmployeeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the database configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(create_pool(config).await?))
    }
}

#[async_trait]
impl EmployeeStore for PgEmployeeStore {
    async fn find(&self, id: EmployeeId) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {} FROM funcionarios WHERE id = $1", COLUMNS);
        sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).during(StoreOperation::Find))
    }

    async fn add(&self, employee: Employee) -> StoreResult<Employee> {
        let sql = format!(
            "INSERT INTO funcionarios \
             (nome, endereco, ramal, email_profissional, departamento, salario, data_admissao) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            COLUMNS
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(&employee.name)
            .bind(&employee.address)
            .bind(&employee.extension)
            .bind(&employee.work_email)
            .bind(&employee.department)
            .bind(employee.salary)
            .bind(employee.admission_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).during(StoreOperation::Add))
    }

    async fn update(&self, employee: &Employee) -> StoreResult<()> {
        sqlx::query(
            "UPDATE funcionarios SET \
             nome = $1, endereco = $2, ramal = $3, email_profissional = $4, \
             departamento = $5, salario = $6, data_admissao = $7 \
             WHERE id = $8",
        )
        .bind(&employee.name)
        .bind(&employee.address)
        .bind(&employee.extension)
        .bind(&employee.work_email)
        .bind(&employee.department)
        .bind(employee.salary)
        .bind(employee.admission_date)
        .bind(employee.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from(e).during(StoreOperation::Update))?;

        Ok(())
    }

    async fn remove(&self, id: EmployeeId) -> StoreResult<()> {
        sqlx::query("DELETE FROM funcionarios WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).during(StoreOperation::Remove))?;

        Ok(())
    }

    async fn can_connect(&self) -> StoreResult<bool> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = StoreError::from(e).during(StoreOperation::Connect);
                if err.is_connection_failure() {
                    tracing::warn!("Record store unreachable: {}", err.message);
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }
}

/// Create a PostgreSQL connection pool with retry logic
///
/// Uses exponential backoff between attempts.
pub(crate) async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Database connection pool created: max={}, min={}",
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a database pool (single try)
async fn try_create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| {
            Error::Internal(format!(
                "Failed to connect to database at '{}': {}",
                sanitize_connection_url(&config.url),
                e
            ))
        })
}

/// Sanitize connection URL for safe logging (remove password)
pub(crate) fn sanitize_connection_url(url: &str) -> String {
    if let (Some(at_pos), Some(scheme_end)) = (url.find('@'), url.find("://")) {
        let credentials = &url[scheme_end + 3..at_pos];
        if let Some(colon_pos) = credentials.find(':') {
            return format!(
                "{}{}:***{}",
                &url[..scheme_end + 3],
                &credentials[..colon_pos],
                &url[at_pos..]
            );
        }
    }
    url.to_string()
}

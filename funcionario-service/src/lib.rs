//! # funcionario-service
//!
//! HTTP API over employee records with an audit trail.
//!
//! Employees live in a relational record store (PostgreSQL). Every create,
//! update and delete is followed by an entry in an audit log table store
//! (Redis), partitioned by department. Both stores fall back to in-memory
//! implementations when they are not configured.
//!
//! ## Example
//!
//! ```rust,no_run
//! use funcionario_service::{handlers, init_tracing, AppState, Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> funcionario_service::Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::builder()
//!         .config(config.clone())
//!         .build()
//!         .await?;
//!
//!     Server::new(config)
//!         .serve(handlers::router(state))
//!         .await
//! }
//! ```

pub mod audit_log;
pub mod config;
pub mod diagnostics;
pub mod employee;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod responses;
pub mod server;
pub mod state;
pub mod store;

pub use audit_log::{ActionKind, AuditLogEntry, AuditLogStore};
pub use config::Config;
pub use employee::{Employee, EmployeeId};
pub use error::{Error, Result};
pub use observability::init_tracing;
pub use server::Server;
pub use state::AppState;
pub use store::EmployeeStore;

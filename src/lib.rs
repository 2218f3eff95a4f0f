//! repokit library
//!
//! A generic data-access layer over sqlx for PostgreSQL and SQLite:
//! repositories parameterized over an entity and a sparse update type, and a
//! transaction manager that carries the active transaction through a
//! request-scoped [`Context`].

pub mod closer;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod repo;

pub use config::{Config, DatabaseConfig};
pub use context::Context;
pub use db::{Db, TxHandle, Txm, extract_tx, inject_tx};
pub use error::{DbError, DbResult, ErrorKind, ResultExt};
pub use repo::{Entity, Repository};

//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management and the context-aware [`Db`] handle
//! - Statement execution on a pool or an open transaction
//! - Transaction handles and their propagation through a context
//! - The transaction manager
//! - Declarative macros for backend dispatch and column binding

pub mod executor;
#[macro_use]
pub mod macros;
pub mod pool;
pub mod transaction;
pub mod txm;

pub use executor::{RowExecutor, RowSource, Rows};
pub use pool::{Db, DbPool};
pub use transaction::{DbTransaction, TxHandle, extract_tx, inject_tx};
pub use txm::Txm;

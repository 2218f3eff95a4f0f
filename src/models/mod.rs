//! Data models for repokit.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod fields;
pub mod value;

// Re-export commonly used types
pub use connection::{ConnectionInfo, DatabaseType, masked_connection_string};
pub use fields::{Changeset, ColumnMap, Field, Nullable, Required, column_map};
pub use value::{ColumnValue, SqlValue};

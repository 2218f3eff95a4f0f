//! Statement construction.
//!
//! Statements are assembled with `sea-query` and rendered for the target
//! [`Dialect`]: `$1, $2, ...` placeholders for PostgreSQL and `?` for SQLite.
//! Identifiers are always quoted, so a column called `order` or `user` needs
//! no special handling by the caller. Values never appear in the SQL text;
//! they travel in [`Statement::values`] and are bound by `sea-query-binder`.

pub mod builder;
pub mod expr;
pub mod filter;
pub mod lock;

pub use builder::{Select, count, exists, insert, update};
pub use expr::{Column, OrderBy, OrderDirection, col};
pub use filter::{Filter, ListFilter};
pub use lock::{LockMode, LockStrength, ReadOptions, WaitPolicy};
pub use sea_query::{Cond, SimpleExpr};

use crate::error::{DbError, DbResult};
use sea_query::{
    Alias, IntoTableRef, PostgresQueryBuilder, QueryStatementWriter, SqliteQueryBuilder, TableRef,
    Values,
};
use sea_query_binder::SqlxValues;

/// SQL flavour a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

/// A rendered statement and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Values,
}

impl Statement {
    pub(crate) fn render<S: QueryStatementWriter>(query: &S, dialect: Dialect) -> Self {
        let (sql, values) = match dialect {
            Dialect::Postgres => query.build(PostgresQueryBuilder),
            Dialect::Sqlite => query.build(SqliteQueryBuilder),
        };
        Self { sql, values }
    }

    /// Number of bound arguments.
    pub fn arg_count(&self) -> usize {
        self.values.0.len()
    }

    pub(crate) fn arguments(&self) -> SqlxValues {
        SqlxValues(self.values.clone())
    }
}

/// A quoted identifier; empty names are rejected.
pub(crate) fn ident(name: &str) -> DbResult<Alias> {
    if name.is_empty() {
        return Err(DbError::invalid_argument("empty identifier"));
    }
    Ok(Alias::new(name))
}

/// A table name, with an optional `schema.` prefix.
pub(crate) fn table_ref(table: &str) -> DbResult<TableRef> {
    match table.split_once('.') {
        Some((schema, name)) => Ok((ident(schema)?, ident(name)?).into_table_ref()),
        None => Ok(ident(table)?.into_table_ref()),
    }
}

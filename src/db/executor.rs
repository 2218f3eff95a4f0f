//! Statement execution.
//!
//! A statement runs the same way whether it goes to the pool or to an open
//! transaction: both implement [`RowSource`]. [`Db::executor`](crate::db::Db::executor)
//! picks the right one for a context and hands it out as a [`RowExecutor`],
//! so callers never branch on where their statements end up.

use crate::db::pool::DbPool;
use crate::db::transaction::{DbTransaction, TxHandle};
use crate::error::{DbError, DbResult};
use crate::impl_db_dispatch;
use crate::query::Statement;
use sea_query_binder::SqlxValues;
use sqlx::postgres::PgRow;
use sqlx::query::Query;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, FromRow, Postgres, Row, Sqlite};
use std::fmt;
use std::future::Future;
use tracing::debug;

/// Anything that can execute a statement and return its rows.
pub trait RowSource {
    fn fetch_rows(&self, stmt: &Statement) -> impl Future<Output = DbResult<Rows>> + Send;

    /// Run unparameterized SQL, possibly several `;`-separated statements,
    /// and return the number of affected rows.
    fn execute_raw(&self, sql: &str) -> impl Future<Output = DbResult<u64>> + Send;
}

fn postgres_query(stmt: &Statement) -> Query<'_, Postgres, SqlxValues> {
    sqlx::query_with(&stmt.sql, stmt.arguments())
}

fn sqlite_query(stmt: &Statement) -> Query<'_, Sqlite, SqlxValues> {
    sqlx::query_with(&stmt.sql, stmt.arguments())
}

/// Rows returned by a statement, still in the driver's representation.
pub enum Rows {
    Postgres(Vec<PgRow>),
    SQLite(Vec<SqliteRow>),
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self {
            Rows::Postgres(_) => "Postgres",
            Rows::SQLite(_) => "SQLite",
        };
        f.debug_struct("Rows")
            .field("backend", &backend)
            .field("len", &self.len())
            .finish()
    }
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Postgres(rows) => rows.len(),
            Rows::SQLite(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode every row into `E`, matching columns by name.
    pub fn decode_all<E>(&self) -> DbResult<Vec<E>>
    where
        E: for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow>,
    {
        match self {
            Rows::Postgres(rows) => rows
                .iter()
                .map(|row| <E as FromRow<'_, PgRow>>::from_row(row).map_err(DbError::from))
                .collect(),
            Rows::SQLite(rows) => rows
                .iter()
                .map(|row| <E as FromRow<'_, SqliteRow>>::from_row(row).map_err(DbError::from))
                .collect(),
        }
    }

    /// Decode the first row into `E`; no rows is [`DbError::NotFound`].
    pub fn decode_one<E>(&self) -> DbResult<E>
    where
        E: for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow>,
    {
        let decoded = match self {
            Rows::Postgres(rows) => rows
                .first()
                .map(|row| <E as FromRow<'_, PgRow>>::from_row(row)),
            Rows::SQLite(rows) => rows
                .first()
                .map(|row| <E as FromRow<'_, SqliteRow>>::from_row(row)),
        };
        match decoded {
            Some(result) => result.map_err(DbError::from),
            None => Err(DbError::NotFound),
        }
    }

    /// The first column of the first row as an integer.
    pub fn scalar_i64(&self) -> DbResult<i64> {
        match self {
            Rows::Postgres(rows) => Ok(first(rows)?.try_get::<i64, _>(0)?),
            Rows::SQLite(rows) => Ok(first(rows)?.try_get::<i64, _>(0)?),
        }
    }

    /// The first column of the first row as a boolean.
    pub fn scalar_bool(&self) -> DbResult<bool> {
        match self {
            Rows::Postgres(rows) => Ok(first(rows)?.try_get::<bool, _>(0)?),
            // SQLite reports EXISTS as an integer
            Rows::SQLite(rows) => Ok(first(rows)?.try_get::<i64, _>(0)? != 0),
        }
    }
}

fn first<R>(rows: &[R]) -> DbResult<&R> {
    rows.first().ok_or(DbError::NotFound)
}

impl RowSource for DbPool {
    async fn fetch_rows(&self, stmt: &Statement) -> DbResult<Rows> {
        debug!(sql = %stmt.sql, params = stmt.arg_count(), "Executing statement on pool");
        let rows = impl_db_dispatch!(self, {
            Postgres(pool) => Rows::Postgres(postgres_query(stmt).fetch_all(pool).await?),
            SQLite(pool) => Rows::SQLite(sqlite_query(stmt).fetch_all(pool).await?),
        });
        Ok(rows)
    }

    async fn execute_raw(&self, sql: &str) -> DbResult<u64> {
        debug!(sql = %sql, "Executing raw SQL on pool");
        let affected = impl_db_dispatch!(self, {
            Postgres(pool) => pool.execute(sql).await?.rows_affected(),
            SQLite(pool) => pool.execute(sql).await?.rows_affected(),
        });
        Ok(affected)
    }
}

impl RowSource for TxHandle {
    async fn fetch_rows(&self, stmt: &Statement) -> DbResult<Rows> {
        let mut guard = self.inner.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(|| self.finished_error())?;

        debug!(
            transaction_id = %self.id(),
            sql = %stmt.sql,
            params = stmt.arg_count(),
            "Executing statement in transaction"
        );
        let rows = match tx {
            DbTransaction::Postgres(tx) => {
                Rows::Postgres(postgres_query(stmt).fetch_all(&mut **tx).await?)
            }
            DbTransaction::SQLite(tx) => {
                Rows::SQLite(sqlite_query(stmt).fetch_all(&mut **tx).await?)
            }
        };
        Ok(rows)
    }

    async fn execute_raw(&self, sql: &str) -> DbResult<u64> {
        let mut guard = self.inner.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(|| self.finished_error())?;

        debug!(transaction_id = %self.id(), sql = %sql, "Executing raw SQL in transaction");
        let affected = match tx {
            DbTransaction::Postgres(tx) => (&mut **tx).execute(sql).await?.rows_affected(),
            DbTransaction::SQLite(tx) => (&mut **tx).execute(sql).await?.rows_affected(),
        };
        Ok(affected)
    }
}

/// The executor a context resolves to: its transaction, or else the pool.
#[derive(Debug)]
pub enum RowExecutor<'a> {
    Pool(&'a DbPool),
    Tx(TxHandle),
}

impl RowExecutor<'_> {
    pub fn in_transaction(&self) -> bool {
        matches!(self, RowExecutor::Tx(_))
    }
}

impl RowSource for RowExecutor<'_> {
    async fn fetch_rows(&self, stmt: &Statement) -> DbResult<Rows> {
        match self {
            RowExecutor::Pool(pool) => pool.fetch_rows(stmt).await,
            RowExecutor::Tx(tx) => tx.fetch_rows(stmt).await,
        }
    }

    async fn execute_raw(&self, sql: &str) -> DbResult<u64> {
        match self {
            RowExecutor::Pool(pool) => pool.execute_raw(sql).await,
            RowExecutor::Tx(tx) => tx.execute_raw(sql).await,
        }
    }
}

//! Generic repository.
//!
//! A [`Repository`] serves one table whose rows decode into an entity `E`
//! and accept sparse updates of type `U`. Every operation takes a
//! [`Context`] and runs on the transaction it carries, or on the pool when
//! it carries none, so the same repository code works inside and outside
//! [`Txm::run`](crate::db::Txm::run).
//!
//! ```no_run
//! use repokit::models::{Nullable, Required};
//! use repokit::query::{ListFilter, col};
//! use repokit::{Context, Db, DbResult, Repository, changeset, entity};
//! use uuid::Uuid;
//!
//! #[derive(Debug, sqlx::FromRow)]
//! struct User {
//!     id: Uuid,
//!     name: String,
//!     email: Option<String>,
//! }
//!
//! entity!(User { id => "id", name => "name", email => "email" });
//!
//! #[derive(Default)]
//! struct UpdateUser {
//!     name: Required<String>,
//!     email: Nullable<String>,
//! }
//!
//! changeset!(UpdateUser { name => "name", email => "email" });
//!
//! # async fn demo(db: Db) -> DbResult<()> {
//! let users: Repository<User, UpdateUser> = Repository::new(db, "users", "id");
//! let ctx = Context::background();
//!
//! let user = users
//!     .create(&ctx, &User { id: Uuid::new_v4(), name: "ada".into(), email: None })
//!     .await?;
//! let renamed = users
//!     .update(&ctx, user.id, &UpdateUser { name: Required::new("Ada".into()), ..Default::default() })
//!     .await?;
//! let named_ada = users
//!     .list(&ctx, &ListFilter::new().filter(col("name").eq("Ada")))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::context::Context;
use crate::db::{Db, RowSource, Rows};
use crate::error::{DbError, DbResult, ErrorKind, ResultExt};
use crate::models::{Changeset, ColumnMap, column_map};
use crate::query::{Filter, ReadOptions, Select, Statement, col, count, exists, insert, update};
use sqlx::FromRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;
use uuid::Uuid;

/// A record stored as one table row.
///
/// Rows decode by column name through `sqlx::FromRow` (derive it);
/// [`columns`](Entity::columns) lists what INSERT writes. Implement it with
/// the [`entity!`](crate::entity) macro.
pub trait Entity:
    for<'r> FromRow<'r, PgRow> + for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin
{
    fn columns(&self) -> ColumnMap;
}

pub struct Repository<E, U> {
    db: Db,
    table: String,
    id_column: String,
    _marker: PhantomData<fn() -> (E, U)>,
}

impl<E, U> Clone for Repository<E, U> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            table: self.table.clone(),
            id_column: self.id_column.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E, U> fmt::Debug for Repository<E, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.table)
            .field("id_column", &self.id_column)
            .finish_non_exhaustive()
    }
}

impl<E, U> Repository<E, U>
where
    E: Entity,
    U: Changeset,
{
    pub fn new(db: Db, table: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            id_column: id_column.into(),
            _marker: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Insert `entity` and return the stored row.
    pub async fn create(&self, ctx: &Context, entity: &E) -> DbResult<E> {
        let stmt = insert(&self.table, entity.columns(), self.db.dialect())
            .with_message("build insert query")?;

        let rows = self.fetch(ctx, &stmt).await.with_message("exec insert query")?;
        rows.decode_one().with_message("scan row")
    }

    /// The row whose identifier is `id`, or `NotFound`.
    pub async fn get(&self, ctx: &Context, id: Uuid) -> DbResult<E> {
        self.get_with(ctx, id, ReadOptions::default()).await
    }

    /// Like [`get`](Self::get), locking the row as `opts` asks.
    pub async fn get_with(&self, ctx: &Context, id: Uuid, opts: ReadOptions) -> DbResult<E> {
        let stmt = Select::from(&self.table)
            .with_message("build select query")?
            .filter(col(self.id_column.as_str()).eq(id))
            .lock(opts.lock)
            .build(self.db.dialect());

        let rows = self.fetch(ctx, &stmt).await.with_message("exec select query")?;
        decode_one_or_not_found(&rows)
    }

    /// Rows matching `filter`, paged and ordered as it says.
    pub async fn list<F>(&self, ctx: &Context, filter: &F) -> DbResult<Vec<E>>
    where
        F: Filter + ?Sized,
    {
        self.list_with(ctx, filter, ReadOptions::default()).await
    }

    pub async fn list_with<F>(&self, ctx: &Context, filter: &F, opts: ReadOptions) -> DbResult<Vec<E>>
    where
        F: Filter + ?Sized,
    {
        let stmt = Select::from(&self.table)
            .with_message("build list query")?
            .apply(filter)
            .lock(opts.lock)
            .build(self.db.dialect());

        let rows = self.fetch(ctx, &stmt).await.with_message("exec list query")?;
        rows.decode_all().with_message("scan rows")
    }

    /// Number of rows matching the predicates of `filter`.
    pub async fn count<F>(&self, ctx: &Context, filter: &F) -> DbResult<i64>
    where
        F: Filter + ?Sized,
    {
        let stmt = count(&self.table, filter, self.db.dialect())
            .with_message("build count query")?;

        let rows = self.fetch(ctx, &stmt).await.with_message("exec count query")?;
        rows.scalar_i64().with_message("scan count")
    }

    /// Whether any row matches the predicates of `filter`.
    pub async fn exists<F>(&self, ctx: &Context, filter: &F) -> DbResult<bool>
    where
        F: Filter + ?Sized,
    {
        let stmt = exists(&self.table, filter, self.db.dialect())
            .with_message("build exists query")?;

        let rows = self.fetch(ctx, &stmt).await.with_message("exec exists query")?;
        rows.scalar_bool().with_message("scan exists")
    }

    /// Write the supplied fields of `update` to the row `id` and return it.
    ///
    /// Fails with `InvalidArgument` without touching the database when no
    /// field is supplied, and with `NotFound` when no row has that id.
    pub async fn update(&self, ctx: &Context, id: Uuid, changes: &U) -> DbResult<E> {
        let values = column_map(changes);
        if values.is_empty() {
            return Err(DbError::invalid_argument("no fields for update"));
        }

        let by_id = col(self.id_column.as_str()).eq(id);
        let stmt = update(&self.table, values, by_id, self.db.dialect())
            .with_message("build update query")?;

        let rows = self.fetch(ctx, &stmt).await.with_message("exec update query")?;
        decode_one_or_not_found(&rows)
    }

    async fn fetch(&self, ctx: &Context, stmt: &Statement) -> DbResult<Rows> {
        let executor = self.db.executor(ctx);
        debug!(
            table = %self.table,
            sql = %stmt.sql,
            in_transaction = executor.in_transaction(),
            "Executing repository statement"
        );
        ctx.run(executor.fetch_rows(stmt)).await
    }
}

/// Zero rows is reported as a bare `NotFound`; other decode failures keep
/// their "scan row" annotation.
fn decode_one_or_not_found<E: Entity>(rows: &Rows) -> DbResult<E> {
    match rows.decode_one() {
        Ok(entity) => Ok(entity),
        Err(err) if err.is(ErrorKind::NotFound) => Err(DbError::NotFound),
        Err(err) => Err(DbError::with_message(Some(err), "scan row")),
    }
}

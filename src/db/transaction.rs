//! Transaction handles and their propagation through a [`Context`].
//!
//! A [`TxHandle`] wraps one open database transaction. The [`Txm`](crate::db::Txm)
//! that began it is the only code that commits or rolls it back; everything
//! else finds it through [`extract_tx`] and runs statements on it.

use crate::context::Context;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlx::{Postgres, Sqlite, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Database-specific transaction wrapper.
pub enum DbTransaction {
    Postgres(Transaction<'static, Postgres>),
    SQLite(Transaction<'static, Sqlite>),
}

impl DbTransaction {
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbTransaction::Postgres(_) => DatabaseType::PostgreSQL,
            DbTransaction::SQLite(_) => DatabaseType::SQLite,
        }
    }

    pub async fn commit(self) -> DbResult<()> {
        match self {
            DbTransaction::Postgres(tx) => tx.commit().await.map_err(DbError::from),
            DbTransaction::SQLite(tx) => tx.commit().await.map_err(DbError::from),
        }
    }

    pub async fn rollback(self) -> DbResult<()> {
        match self {
            DbTransaction::Postgres(tx) => tx.rollback().await.map_err(DbError::from),
            DbTransaction::SQLite(tx) => tx.rollback().await.map_err(DbError::from),
        }
    }
}

impl std::fmt::Debug for DbTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DbTransaction").field(&self.db_type()).finish()
    }
}

pub(crate) struct TxInner {
    id: Uuid,
    pub(crate) tx: Mutex<Option<DbTransaction>>,
}

/// Shared reference to an open transaction.
///
/// Clones refer to the same transaction. Statements issued through any clone
/// run one at a time, in the order they acquire the handle.
#[derive(Clone)]
pub struct TxHandle {
    pub(crate) inner: Arc<TxInner>,
}

impl TxHandle {
    pub(crate) fn new(tx: DbTransaction) -> Self {
        let id = Uuid::new_v4();
        debug!(transaction_id = %id, db_type = %tx.db_type(), "Began transaction");
        Self {
            inner: Arc::new(TxInner {
                id,
                tx: Mutex::new(Some(tx)),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Whether both handles refer to the same transaction.
    pub fn same_as(&self, other: &TxHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the transaction has not been committed or rolled back yet.
    pub async fn is_active(&self) -> bool {
        self.inner.tx.lock().await.is_some()
    }

    pub(crate) fn finished_error(&self) -> DbError {
        DbError::transaction("transaction is no longer active", self.id().to_string())
    }

    async fn take(&self) -> DbResult<DbTransaction> {
        self.inner
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| self.finished_error())
    }

    pub(crate) async fn commit(&self) -> DbResult<()> {
        let tx = self.take().await?;
        tx.commit().await?;
        debug!(transaction_id = %self.id(), "Committed transaction");
        Ok(())
    }

    pub(crate) async fn rollback(&self) -> DbResult<()> {
        let tx = self.take().await?;
        tx.rollback().await?;
        debug!(transaction_id = %self.id(), "Rolled back transaction");
        Ok(())
    }
}

impl std::fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxHandle").field("id", &self.id()).finish()
    }
}

/// Context key for the active transaction. Private so that nothing outside
/// this module can read or shadow it.
struct TxSlot(TxHandle);

/// Derive a context that carries `tx`.
pub fn inject_tx(ctx: &Context, tx: TxHandle) -> Context {
    ctx.with_value(TxSlot(tx))
}

/// The transaction carried by `ctx`, if any.
pub fn extract_tx(ctx: &Context) -> Option<TxHandle> {
    ctx.value::<TxSlot>().map(|slot| slot.0.clone())
}

//! Transaction manager.
//!
//! [`Txm::run`] executes a unit of work inside a transaction. The transaction
//! travels in the context handed to the work, so any repository call made
//! with that context, however deeply nested, joins it. A nested `run` finds
//! the transaction already present and simply calls its work: only the
//! outermost `run` begins, commits or rolls back.
//!
//! ```no_run
//! # use repokit::{Context, Db, DbResult, Txm};
//! # async fn transfer(db: Db) -> DbResult<()> {
//! let txm = Txm::new(db);
//! let ctx = Context::background();
//! txm.run(&ctx, |tx_ctx| async move {
//!     // repository calls made with `tx_ctx` share one transaction
//!     Ok(())
//! })
//! .await
//! # }
//! ```

use crate::context::Context;
use crate::db::pool::Db;
use crate::db::transaction::{extract_tx, inject_tx};
use crate::error::{DbResult, ResultExt};
use std::future::Future;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Txm {
    db: Db,
}

impl Txm {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Run `work` in a transaction and return its value.
    ///
    /// - `ctx` already carries a transaction: `work` runs on it unchanged.
    /// - otherwise a transaction is begun and `work` gets a context carrying
    ///   it. An `Ok` result is committed; a commit failure is returned as
    ///   "commit transaction". An `Err` result is rolled back and returned as
    ///   is; a failed rollback is only logged.
    ///
    /// Serialization conflicts are not retried here; check
    /// [`DbError::is_retryable`](crate::DbError::is_retryable) and call `run`
    /// again.
    pub async fn run<F, Fut, T>(&self, ctx: &Context, work: F) -> DbResult<T>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        if let Some(tx) = extract_tx(ctx) {
            debug!(transaction_id = %tx.id(), "Joining active transaction");
            return work(ctx.clone()).await;
        }

        let tx = self.db.begin(ctx).await.with_message("begin transaction")?;
        let tx_ctx = inject_tx(ctx, tx.clone());

        match work(tx_ctx).await {
            Ok(value) => {
                tx.commit().await.with_message("commit transaction")?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        transaction_id = %tx.id(),
                        error = %rollback_err,
                        cause = %err,
                        "Failed to roll back transaction"
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::error::{DbError, ErrorKind};
    use tempfile::TempDir;

    async fn sqlite_txm() -> (Txm, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("txm.db").display());
        let config = DatabaseConfig::parse(&url).unwrap();
        let db = Db::connect(&Context::background(), &config).await.unwrap();
        (Txm::new(db), dir)
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_work_error() {
        let (txm, _dir) = sqlite_txm().await;

        let err = txm
            .run(&Context::background(), |tx_ctx| async move {
                // finishing early makes the manager's own rollback fail
                let tx = extract_tx(&tx_ctx).unwrap();
                tx.rollback().await?;
                Err::<(), _>(DbError::aborted("original"))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Aborted);
        assert_eq!(err.to_string(), "aborted: original");
    }

    #[tokio::test]
    async fn test_failed_commit_is_reported() {
        let (txm, _dir) = sqlite_txm().await;

        let err = txm
            .run(&Context::background(), |tx_ctx| async move {
                let tx = extract_tx(&tx_ctx).unwrap();
                tx.commit().await?;
                Ok(42)
            })
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("commit transaction"));
        assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    }
}

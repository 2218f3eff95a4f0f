//! Integration tests for transaction functionality on SQLite.
//!
//! Tests verify that:
//! - Work that succeeds is committed and visible afterwards
//! - Work that fails is rolled back and its error returned unchanged
//! - Nested runs join the outer transaction without finishing it
//! - Cancellation mid-transaction rolls back
//! - A handle is unusable once its transaction has finished

use repokit::models::Required;
use repokit::query::ListFilter;
use repokit::{
    Context, DatabaseConfig, Db, DbError, ErrorKind, Repository, Txm, changeset, entity,
    extract_tx, inject_tx,
};
use tempfile::TempDir;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
struct Account {
    id: Uuid,
    owner: String,
    balance: i64,
}

entity!(Account {
    id => "id",
    owner => "owner",
    balance => "balance",
});

#[derive(Default)]
struct UpdateAccount {
    balance: Required<i64>,
}

changeset!(UpdateAccount {
    balance => "balance",
});

fn account(owner: &str, balance: i64) -> Account {
    Account {
        id: Uuid::new_v4(),
        owner: owner.to_string(),
        balance,
    }
}

/// Create a SQLite database with an `accounts` table in a temporary directory.
async fn setup() -> (Txm, Repository<Account, UpdateAccount>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("tx.db").display());
    let config = DatabaseConfig::parse(&url).unwrap();

    let ctx = Context::background();
    let db = Db::connect(&ctx, &config).await.unwrap();
    db.execute(
        &ctx,
        "CREATE TABLE accounts (
            id BLOB PRIMARY KEY,
            owner TEXT NOT NULL,
            balance INTEGER NOT NULL
        )",
    )
    .await
    .unwrap();

    (
        Txm::new(db.clone()),
        Repository::new(db, "accounts", "id"),
        dir,
    )
}

#[tokio::test]
async fn test_commit_makes_writes_visible() {
    let (txm, accounts, _dir) = setup().await;
    let ctx = Context::background();
    let alice = account("alice", 100);

    let repo = &accounts;
    let created = txm
        .run(&ctx, |tx_ctx| {
            let alice = alice.clone();
            async move {
                let created = repo.create(&tx_ctx, &alice).await?;
                repo.update(
                    &tx_ctx,
                    created.id,
                    &UpdateAccount {
                        balance: Required::new(150),
                    },
                )
                .await
            }
        })
        .await
        .unwrap();

    assert_eq!(created.balance, 150);
    assert!(extract_tx(&ctx).is_none());
    assert_eq!(accounts.get(&ctx, alice.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_failure_rolls_back() {
    let (txm, accounts, _dir) = setup().await;
    let ctx = Context::background();
    let alice = account("alice", 100);

    let repo = &accounts;
    let err = txm
        .run(&ctx, |tx_ctx| {
            let alice = alice.clone();
            async move {
                repo.create(&tx_ctx, &alice).await?;
                Err::<(), _>(DbError::aborted("insufficient funds"))
            }
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Aborted);
    assert_eq!(err.to_string(), "aborted: insufficient funds");

    let err = accounts.get(&ctx, alice.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(accounts.count(&ctx, &ListFilter::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_nested_run_reuses_transaction() {
    let (txm, accounts, _dir) = setup().await;
    let ctx = Context::background();
    let alice = account("alice", 100);
    let bob = account("bob", 20);

    let repo = &accounts;
    let txm_ref = &txm;
    txm.run(&ctx, |outer_ctx| {
        let (alice, bob) = (alice.clone(), bob.clone());
        async move {
            let outer = extract_tx(&outer_ctx).expect("outer transaction");
            repo.create(&outer_ctx, &alice).await?;

            txm_ref
                .run(&outer_ctx, |inner_ctx| {
                    let outer = outer.clone();
                    async move {
                        let inner = extract_tx(&inner_ctx).expect("inner transaction");
                        assert!(inner.same_as(&outer));
                        assert_eq!(inner.id(), outer.id());
                        repo.create(&inner_ctx, &bob).await?;
                        Ok::<_, DbError>(())
                    }
                })
                .await?;

            // the inner run neither committed nor closed the transaction
            assert!(outer.is_active().await);
            assert_eq!(repo.count(&outer_ctx, &ListFilter::new()).await?, 2);
            Ok::<_, DbError>(())
        }
    })
    .await
    .unwrap();

    assert_eq!(accounts.count(&ctx, &ListFilter::new()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_nested_failure_does_not_roll_back() {
    let (txm, accounts, _dir) = setup().await;
    let ctx = Context::background();
    let alice = account("alice", 100);

    let repo = &accounts;
    let txm_ref = &txm;
    txm.run(&ctx, |outer_ctx| {
        let alice = alice.clone();
        async move {
            repo.create(&outer_ctx, &alice).await?;

            let inner = txm_ref
                .run(&outer_ctx, |_inner_ctx| async {
                    Err::<(), _>(DbError::failed_precondition("account frozen"))
                })
                .await;
            assert_eq!(inner.unwrap_err().kind(), ErrorKind::FailedPrecondition);

            // the outer unit of work decides; the insert is still there
            assert_eq!(repo.get(&outer_ctx, alice.id).await?, alice);
            Ok::<_, DbError>(())
        }
    })
    .await
    .unwrap();

    assert_eq!(accounts.get(&ctx, alice.id).await.unwrap(), alice);
}

#[tokio::test]
async fn test_cancel_mid_transaction_rolls_back() {
    let (txm, accounts, _dir) = setup().await;
    let (ctx, token) = Context::background().with_cancel();
    let alice = account("alice", 100);

    let repo = &accounts;
    let err = txm
        .run(&ctx, |tx_ctx| {
            let alice = alice.clone();
            let token = token.clone();
            async move {
                repo.create(&tx_ctx, &alice).await?;
                token.cancel();
                repo.get(&tx_ctx, alice.id).await
            }
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let live = Context::background();
    assert!(!accounts.exists(&live, &ListFilter::new()).await.unwrap());
}

#[tokio::test]
async fn test_cancelled_before_begin() {
    let (txm, _accounts, _dir) = setup().await;
    let (ctx, token) = Context::background().with_cancel();
    token.cancel();

    let mut ran = false;
    let err = txm
        .run(&ctx, |_tx_ctx| {
            ran = true;
            async { Ok::<_, DbError>(()) }
        })
        .await
        .unwrap_err();

    assert!(!ran);
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(err.to_string().starts_with("begin transaction"));
}

#[tokio::test]
async fn test_handle_unusable_after_finish() {
    let (txm, accounts, _dir) = setup().await;
    let ctx = Context::background();

    let handle = txm
        .run(&ctx, |tx_ctx| async move {
            Ok::<_, DbError>(extract_tx(&tx_ctx).expect("transaction"))
        })
        .await
        .unwrap();
    assert!(!handle.is_active().await);

    let stale = inject_tx(&ctx, handle);
    let err = accounts.get(&stale, Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(err.to_string().contains("no longer active"));
}

#[tokio::test]
async fn test_separate_runs_use_separate_transactions() {
    let (txm, _accounts, _dir) = setup().await;
    let ctx = Context::background();

    let first = txm
        .run(&ctx, |c| async move { Ok::<_, DbError>(extract_tx(&c).expect("transaction")) })
        .await
        .unwrap();
    let second = txm
        .run(&ctx, |c| async move { Ok::<_, DbError>(extract_tx(&c).expect("transaction")) })
        .await
        .unwrap();

    assert!(!first.same_as(&second));
    assert_ne!(first.id(), second.id());
}

//! Request-scoped context.
//!
//! A [`Context`] is an immutable chain of values plus a cancellation signal and
//! an optional deadline. Deriving a context never changes its parent: every
//! `with_*` call returns a new context that sees its own value first and then
//! everything its ancestors carry.
//!
//! Store operations run through [`Context::run`], which fails with
//! [`DbError::Cancelled`] or [`DbError::DeadlineExceeded`] as soon as the
//! context is cancelled or its deadline passes.

use crate::error::{DbError, DbResult};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Node {
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

#[derive(Clone)]
pub struct Context {
    values: Option<Arc<Node>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// An empty context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            values: None,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a context carrying `value`.
    ///
    /// Values are looked up by type, so a private newtype makes a key nobody
    /// else can read or shadow.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        Self {
            values: Some(Arc::new(Node {
                value: Box::new(value),
                parent: self.values.clone(),
            })),
            cancel: self.cancel.clone(),
            deadline: self.deadline,
        }
    }

    /// The innermost value of type `T`, if any ancestor carries one.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        let mut node = self.values.as_deref();
        while let Some(current) = node {
            if let Some(value) = current.value.downcast_ref::<T>() {
                return Some(value);
            }
            node = current.parent.as_deref();
        }
        None
    }

    /// Derive a cancellable context.
    ///
    /// Cancelling the returned token cancels the new context and everything
    /// derived from it; cancelling the parent still cancels the child.
    pub fn with_cancel(&self) -> (Self, CancellationToken) {
        let token = self.cancel.child_token();
        let ctx = Self {
            values: self.values.clone(),
            cancel: token.clone(),
            deadline: self.deadline,
        };
        (ctx, token)
    }

    /// Derive a context that expires at `deadline` (or earlier, if the parent does).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            values: self.values.clone(),
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Why this context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<DbError> {
        if self.cancel.is_cancelled() {
            return Some(DbError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DbError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drive `fut` to completion unless the context is cancelled or expires first.
    ///
    /// When the context wins, `fut` is dropped mid-flight.
    pub async fn run<F, T>(&self, fut: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DbError::Cancelled),
            _ = sleep_until(self.deadline) => Err(DbError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("has_values", &self.values.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

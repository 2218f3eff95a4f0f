//! Process-wide shutdown hooks.
//!
//! Resources register a cleanup callback when they are created (the database
//! pool does so in [`Db::connect`](crate::db::Db::connect)). At teardown
//! [`close_all`] runs every callback exactly once, in registration order. A
//! failing callback is logged and the remaining ones still run.

use crate::context::Context;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tracing::{debug, error};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type CloseFn = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;
type CloseFnWithContext = Box<dyn FnOnce(Context) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

enum Callback {
    Plain(CloseFn),
    WithContext(CloseFnWithContext),
}

static GLOBAL: LazyLock<Closer> = LazyLock::new(Closer::new);

/// The registry used by the free functions of this module.
pub fn global() -> &'static Closer {
    &GLOBAL
}

/// Register a cleanup callback with the global registry.
pub fn add_fn<F>(f: F)
where
    F: FnOnce() -> Result<(), BoxError> + Send + 'static,
{
    GLOBAL.add_fn(f);
}

/// Register a context-taking cleanup callback with the global registry.
pub fn add_fn_with_context<F, Fut>(f: F)
where
    F: FnOnce(Context) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    GLOBAL.add_fn_with_context(f);
}

/// Run every callback registered with the global registry.
pub async fn close_all(ctx: &Context) {
    GLOBAL.close_all(ctx).await;
}

/// An ordered list of cleanup callbacks.
#[derive(Default)]
pub struct Closer {
    callbacks: Mutex<Vec<Callback>>,
}

impl Closer {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn add_fn<F>(&self, f: F)
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        self.lock().push(Callback::Plain(Box::new(f)));
    }

    pub fn add_fn_with_context<F, Fut>(&self, f: F)
    where
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.lock()
            .push(Callback::WithContext(Box::new(move |ctx| Box::pin(f(ctx)))));
    }

    /// Number of callbacks still waiting to run.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run and forget every registered callback.
    ///
    /// Callbacks registered while this runs are kept for the next call.
    pub async fn close_all(&self, ctx: &Context) {
        let callbacks = std::mem::take(&mut *self.lock());
        debug!(count = callbacks.len(), "Running shutdown callbacks");

        for (index, callback) in callbacks.into_iter().enumerate() {
            let result = match callback {
                Callback::Plain(f) => f(),
                Callback::WithContext(f) => f(ctx.clone()).await,
            };
            if let Err(e) = result {
                error!(index = index, error = %e, "Shutdown callback failed");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Callback>> {
        // a panicking callback cannot leave the list half-updated
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for Closer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Closer")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_callbacks_run_in_registration_order() {
        let closer = Closer::new();
        let log = recorder();

        let l = log.clone();
        closer.add_fn(move || {
            l.lock().unwrap().push("first");
            Ok(())
        });
        let l = log.clone();
        closer.add_fn_with_context(move |_ctx| async move {
            l.lock().unwrap().push("second");
            Ok(())
        });
        let l = log.clone();
        closer.add_fn(move || {
            l.lock().unwrap().push("third");
            Ok(())
        });

        closer.close_all(&Context::background()).await;

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_callbacks() {
        let closer = Closer::new();
        let log = recorder();

        closer.add_fn(|| Err("pool already closed".into()));
        closer.add_fn_with_context(|_ctx| async { Err::<(), BoxError>("flush failed".into()) });
        let l = log.clone();
        closer.add_fn(move || {
            l.lock().unwrap().push("ran");
            Ok(())
        });

        closer.close_all(&Context::background()).await;

        assert_eq!(*log.lock().unwrap(), vec!["ran"]);
    }

    #[tokio::test]
    async fn test_each_callback_runs_once() {
        let closer = Closer::new();
        let log = recorder();

        let l = log.clone();
        closer.add_fn(move || {
            l.lock().unwrap().push("closed");
            Ok(())
        });
        assert_eq!(closer.len(), 1);

        closer.close_all(&Context::background()).await;
        closer.close_all(&Context::background()).await;

        assert!(closer.is_empty());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_context_is_passed_through() {
        #[derive(Debug)]
        struct Marker;

        let closer = Closer::new();
        let seen = Arc::new(Mutex::new(false));
        let s = seen.clone();
        closer.add_fn_with_context(move |ctx| async move {
            *s.lock().unwrap() = ctx.value::<Marker>().is_some();
            Ok(())
        });

        closer
            .close_all(&Context::background().with_value(Marker))
            .await;

        assert!(*seen.lock().unwrap());
    }
}

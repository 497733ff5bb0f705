//! The at-most-once-invokable cancel capability handed to mappers and reducers.

use crate::cancellation::CancellationToken;
use crate::error::MapReduceError;
use crate::source::SourceHandle;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type DrainFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Idempotent cancellation capability passed to mapper and reducer callbacks.
///
/// Only the first call (whether via [`Cancel::call`] or an internal panic
/// route) records an error and tears the pipeline down; later calls are
/// no-ops. Cloning shares the same underlying state — every mapper task and
/// the reducer task hold a clone of the same `Cancel`.
pub struct Cancel<E> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    error: Mutex<Option<MapReduceError<E>>>,
    error_recorded: AtomicBool,
    teardown_started: AtomicBool,
    done: CancellationToken,
    drain: Box<dyn Fn() -> DrainFuture + Send + Sync>,
}

impl<E> Clone for Cancel<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Send + 'static> Cancel<E> {
    /// Build a cancel capability bound to `done` (the pipeline's internal
    /// teardown signal) and `source` (the producer channel that must be
    /// drained on cancel so a still-running producer can unblock).
    ///
    /// `T` is erased from `Cancel`'s public type: it only appears here, while
    /// building the drain closure.
    pub(crate) fn new<T: Send + 'static>(done: CancellationToken, source: SourceHandle<T>) -> Self {
        let drain: Box<dyn Fn() -> DrainFuture + Send + Sync> = Box::new(move || {
            let source = Arc::clone(&source);
            Box::pin(async move {
                let mut receiver = source.lock().await;
                while receiver.recv().await.is_some() {}
            })
        });

        Self {
            inner: Arc::new(Inner {
                error: Mutex::new(None),
                error_recorded: AtomicBool::new(false),
                teardown_started: AtomicBool::new(false),
                done,
                drain,
            }),
        }
    }

    /// Report cancellation, optionally carrying the first error.
    ///
    /// Idempotent: only the first call across all clones of this `Cancel`
    /// records an error or tears the pipeline down. A mapper or reducer that
    /// both calls `cancel(Some(err))` and also writes a value races the
    /// teardown — the write may or may not be observed downstream; only the
    /// first-error contract is guaranteed.
    pub async fn call(&self, err: Option<E>) {
        let outcome = match err {
            Some(err) => MapReduceError::Cancelled(err),
            None => MapReduceError::CancelWithNil,
        };
        self.record(outcome).await;
    }

    pub(crate) async fn call_panicked(&self, message: String) {
        self.record(MapReduceError::Panicked(message)).await;
    }

    async fn record(&self, error: MapReduceError<E>) {
        if self.inner.error_recorded.swap(true, Ordering::SeqCst) {
            tracing::debug!("cancel invoked again; ignoring, first error already recorded");
        } else {
            tracing::debug!("cancel invoked; recording first error and tearing down");
            *self.inner.error.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(error);
        }
        self.teardown().await;
    }

    /// Close the pipeline down without recording an error — used by a reducer
    /// that completes cleanly, which must still close `done` (and, through
    /// it, `output`) via the same idempotent path `cancel` uses.
    pub(crate) async fn teardown(&self) {
        if self.inner.teardown_started.swap(true, Ordering::SeqCst) {
            return;
        }
        (self.inner.drain)().await;
        self.inner.done.cancel();
    }

    /// Take the recorded error, if any. Intended to be read exactly once, by
    /// the orchestrator, after every task holding a clone of this `Cancel`
    /// has finished.
    pub(crate) fn take_error(&self) -> Option<MapReduceError<E>> {
        self.inner
            .error
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .take()
    }
}

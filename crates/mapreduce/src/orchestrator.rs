//! Wires producer, worker pool, and reducer together and owns the
//! cancel-once protocol, the output channel, and panic recovery.

use crate::cancel::Cancel;
use crate::cancellation::CancellationToken;
use crate::error::MapReduceError;
use crate::options::Options;
use crate::pool;
use crate::source::{self, SourceHandle};
use crate::writer::Writer;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Run a full producer → mapper → reducer pipeline.
///
/// See the crate-level documentation for the exact contract; in short: the
/// first error reported by any mapper or reducer (via `cancel`, or a panic)
/// wins, the reducer must write exactly one value on a clean run, and every
/// spawned task is joined before this returns.
pub async fn map_reduce<T, U, V, E, P, PFut, M, MFut, R, RFut>(
    producer: P,
    mapper: M,
    reducer: R,
    options: Options,
) -> Result<V, MapReduceError<E>>
where
    T: Send + 'static,
    U: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
    P: FnOnce(mpsc::Sender<T>) -> PFut + Send + 'static,
    PFut: Future<Output = ()> + Send + 'static,
    M: Fn(T, Writer<U>, Cancel<E>) -> MFut + Send + Sync + 'static,
    MFut: Future<Output = ()> + Send + 'static,
    R: FnOnce(mpsc::Receiver<U>, Writer<V>, Cancel<E>) -> RFut + Send + 'static,
    RFut: Future<Output = mpsc::Receiver<U>> + Send + 'static,
{
    let (source, producer_handle) = source::build_source(producer);
    run(source, Some(producer_handle), mapper, reducer, options).await
}

/// As [`map_reduce`], but the caller supplies an already-running source
/// channel rather than a producer function.
///
/// There is no producer task to join: the caller owns the lifetime of
/// whatever is feeding `source`.
pub async fn map_reduce_with_source<T, U, V, E, M, MFut, R, RFut>(
    source: mpsc::Receiver<T>,
    mapper: M,
    reducer: R,
    options: Options,
) -> Result<V, MapReduceError<E>>
where
    T: Send + 'static,
    U: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
    M: Fn(T, Writer<U>, Cancel<E>) -> MFut + Send + Sync + 'static,
    MFut: Future<Output = ()> + Send + 'static,
    R: FnOnce(mpsc::Receiver<U>, Writer<V>, Cancel<E>) -> RFut + Send + 'static,
    RFut: Future<Output = mpsc::Receiver<U>> + Send + 'static,
{
    let source: SourceHandle<T> = std::sync::Arc::new(tokio::sync::Mutex::new(source));
    run(source, None, mapper, reducer, options).await
}

async fn run<T, U, V, E, M, MFut, R, RFut>(
    source: SourceHandle<T>,
    producer_handle: Option<JoinHandle<()>>,
    mapper: M,
    reducer: R,
    options: Options,
) -> Result<V, MapReduceError<E>>
where
    T: Send + 'static,
    U: Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
    M: Fn(T, Writer<U>, Cancel<E>) -> MFut + Send + Sync + 'static,
    MFut: Future<Output = ()> + Send + 'static,
    R: FnOnce(mpsc::Receiver<U>, Writer<V>, Cancel<E>) -> RFut + Send + 'static,
    RFut: Future<Output = mpsc::Receiver<U>> + Send + 'static,
{
    tracing::debug!(workers = options.workers, "map_reduce pipeline starting");

    let done = CancellationToken::new();
    let external = options.external_token();
    let cancel: Cancel<E> = Cancel::new(done.clone(), Arc::clone(&source));

    // Collector is buffered to the worker count: a mapper's write should
    // never have to wait long for the reducer once a slot is free, so a
    // pending write discarded by a just-triggered cancellation unblocks
    // promptly rather than lingering.
    let (collector_tx, collector_rx) = mpsc::channel::<U>(options.workers);
    // Output is buffered to 1, the closest bounded-channel stand-in for an
    // unbuffered channel: the reducer's single allowed write always fits, but
    // a forbidden second write has nowhere to go until the orchestrator's own
    // tail read makes room — which is exactly how the double-write is caught.
    let (output_tx, mut output_rx) = mpsc::channel::<V>(1);

    let collector_writer = Writer::new(collector_tx, external.clone(), done.clone());
    let output_writer = Writer::new(output_tx, external.clone(), done.clone());

    // The worker pool only watches `done`; bridge the caller's external
    // cancellation handle onto it so the pool stops pulling from `source`
    // without recording an error (external cancellation alone never
    // synthesizes a business error — the reducer simply sees a drained,
    // closed collector and the pipeline surfaces `ReduceNoOutput`).
    let bridge_handle: JoinHandle<()> = {
        let external = external.clone();
        let done = done.clone();
        let bridge_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = external.cancelled() => bridge_cancel.teardown().await,
                () = done.cancelled() => {},
            }
        })
    };

    let pool_handle = {
        let mapper_cancel = cancel.clone();
        let bound_mapper = move |item: T| -> Pin<Box<dyn Future<Output = ()> + Send>> {
            let writer = collector_writer.clone();
            let cancel = mapper_cancel.clone();
            let mapper_item = mapper(item, writer, cancel);
            Box::pin(mapper_item)
        };

        let on_panic_cancel = cancel.clone();
        let on_panic = move |message: String| -> BoxFuture<()> {
            let cancel = on_panic_cancel.clone();
            Box::pin(async move { cancel.call_panicked(message).await })
        };

        tokio::spawn(pool::execute_mappers(
            Arc::clone(&source),
            options.workers,
            done.clone(),
            bound_mapper,
            on_panic,
        ))
    };

    let reducer_handle: JoinHandle<()> = {
        let reducer_cancel = cancel.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(async {
                reducer(collector_rx, output_writer, reducer_cancel.clone()).await
            })
            .catch_unwind()
            .await;
            match outcome {
                Ok(mut leftover) => {
                    while leftover.recv().await.is_some() {}
                    reducer_cancel.teardown().await;
                },
                Err(payload) => {
                    reducer_cancel.call_panicked(panic_payload_message(&payload)).await;
                },
            }
        })
    };

    let first_value = output_rx.recv().await;

    if let Some(handle) = producer_handle {
        if let Err(join_error) = handle.await {
            if join_error.is_panic() {
                tracing::warn!(error = %join_error, "producer task panicked; ignored per pipeline contract");
            }
        }
    }
    if let Err(join_error) = pool_handle.await {
        tracing::error!(error = %join_error, "worker pool driver task failed unexpectedly");
    }
    if let Err(join_error) = reducer_handle.await {
        tracing::error!(error = %join_error, "reducer task failed unexpectedly");
    }
    if let Err(join_error) = bridge_handle.await {
        tracing::error!(error = %join_error, "cancellation bridge task failed unexpectedly");
    }

    assert!(
        output_rx.recv().await.is_none(),
        "reducer wrote to its output more than once"
    );

    if let Some(error) = cancel.take_error() {
        tracing::warn!(cancelled = error.is_cancelled(), "map_reduce pipeline finished with an error");
        return Err(error);
    }

    match first_value {
        Some(value) => {
            tracing::debug!("map_reduce pipeline finished with a value");
            Ok(value)
        },
        None => {
            tracing::warn!("map_reduce pipeline finished without a reduced value");
            Err(MapReduceError::ReduceNoOutput)
        },
    }
}

/// As [`map_reduce`], but the reducer produces no value of its own.
///
/// Internally wraps the reducer so it still satisfies the orchestrator's
/// exactly-one-final-value contract: once the reducer returns, a throwaway
/// sentinel is written in its place. The caller never sees it.
pub async fn map_reduce_void<T, U, E, P, PFut, M, MFut, R, RFut>(
    producer: P,
    mapper: M,
    reducer: R,
    options: Options,
) -> Result<(), MapReduceError<E>>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    P: FnOnce(mpsc::Sender<T>) -> PFut + Send + 'static,
    PFut: Future<Output = ()> + Send + 'static,
    M: Fn(T, Writer<U>, Cancel<E>) -> MFut + Send + Sync + 'static,
    MFut: Future<Output = ()> + Send + 'static,
    R: FnOnce(mpsc::Receiver<U>, Cancel<E>) -> RFut + Send + 'static,
    RFut: Future<Output = mpsc::Receiver<U>> + Send + 'static,
{
    map_reduce(
        producer,
        mapper,
        move |collector, writer: Writer<()>, cancel| async move {
            let collector = reducer(collector, cancel).await;
            writer.write(()).await;
            collector
        },
        options,
    )
    .await
}

fn panic_payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "reducer panicked with a non-string payload".to_string()
}

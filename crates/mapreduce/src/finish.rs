//! Fan out a fixed list of effectful callbacks and collapse their result.

use crate::cancel::Cancel;
use crate::error::FinishError;
use crate::map::map_void;
use crate::options::Options;
use crate::orchestrator::map_reduce;
use crate::writer::Writer;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A single callback passed to [`finish`]: effectful, fallible, run at most once.
pub type FinishFn = Box<dyn FnOnce() -> BoxFuture<Result<(), Box<dyn Error + Send + Sync>>> + Send>;

/// A single callback passed to [`finish_void`]: effectful, run at most once.
pub type FinishVoidFn = Box<dyn FnOnce() -> BoxFuture<()> + Send>;

/// Run every callback in `callbacks` concurrently (one worker per callback)
/// and return the first error reported, if any.
///
/// A failing callback does not cancel the others — every callback always
/// runs to completion; only the error returned to the caller reflects the
/// first failure observed.
pub async fn finish(callbacks: Vec<FinishFn>) -> Result<(), FinishError> {
    let workers = callbacks.len().max(1);

    let result = map_reduce(
        |tx: mpsc::Sender<FinishFn>| async move {
            for callback in callbacks {
                if tx.send(callback).await.is_err() {
                    return;
                }
            }
        },
        |callback: FinishFn,
         _writer: Writer<()>,
         cancel: Cancel<Box<dyn Error + Send + Sync>>| async move {
            if let Err(err) = callback().await {
                cancel.call(Some(err)).await;
            }
        },
        |mut collector: mpsc::Receiver<()>,
         writer: Writer<()>,
         _cancel: Cancel<Box<dyn Error + Send + Sync>>| async move {
            while collector.recv().await.is_some() {}
            writer.write(()).await;
            collector
        },
        Options::new().workers(workers),
    )
    .await;

    result.map_err(FinishError::from_mapreduce)
}

/// As [`finish`], but discards any error a callback reports.
pub async fn finish_void(callbacks: Vec<FinishVoidFn>) {
    let workers = callbacks.len().max(1);

    map_void(
        |tx: mpsc::Sender<FinishVoidFn>| async move {
            for callback in callbacks {
                if tx.send(callback).await.is_err() {
                    return;
                }
            }
        },
        |callback: FinishVoidFn, _writer: Writer<()>| async move {
            callback().await;
        },
        Options::new().workers(workers),
    )
    .await;
}

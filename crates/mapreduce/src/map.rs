//! The reducer-less entry points: drive the worker pool and hand the caller
//! the collector channel directly instead of folding it through a reducer.

use crate::cancellation::CancellationToken;
use crate::options::Options;
use crate::pool;
use crate::source::{self, SourceHandle};
use crate::writer::Writer;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Run `producer` through a bounded-parallel pool of `mapper` tasks and
/// return the channel mapper outputs land on.
///
/// Unlike [`crate::map_reduce`], there is no reducer and no `cancel`
/// capability: a panicking mapper is logged and otherwise ignored (the
/// caller's responsibility, per the no-reducer contract), and the only way to
/// stop early is the external cancellation handle in `options`.
///
/// Producer and pool driver tasks continue running in the background; their
/// eventual completion (and any panic) is only logged, not surfaced here —
/// the returned channel is the caller's sole handle on progress.
pub async fn map<T, U, P, PFut, M, MFut>(producer: P, mapper: M, options: Options) -> mpsc::Receiver<U>
where
    T: Send + 'static,
    U: Send + 'static,
    P: FnOnce(mpsc::Sender<T>) -> PFut + Send + 'static,
    PFut: Future<Output = ()> + Send + 'static,
    M: Fn(T, Writer<U>) -> MFut + Send + Sync + 'static,
    MFut: Future<Output = ()> + Send + 'static,
{
    let (source, producer_handle) = source::build_source(producer);
    let done = CancellationToken::new();
    let external = options.external_token();

    let (collector_tx, collector_rx) = mpsc::channel::<U>(options.workers);
    let collector_writer = Writer::new(collector_tx, external.clone(), done.clone());

    let bridge_handle = {
        let external = external.clone();
        let done = done.clone();
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            tokio::select! {
                () = external.cancelled() => drain(source).await,
                () = done.cancelled() => {},
            }
            done.cancel();
        })
    };

    let pool_handle = {
        let bound_mapper = move |item: T| -> Pin<Box<dyn Future<Output = ()> + Send>> {
            let writer = collector_writer.clone();
            Box::pin(mapper(item, writer))
        };

        tokio::spawn(pool::execute_mappers(
            Arc::clone(&source),
            options.workers,
            done,
            bound_mapper,
            |message: String| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                Box::pin(async move {
                    tracing::warn!(message, "mapper panicked in the reducer-less path; ignored");
                })
            },
        ))
    };

    tokio::spawn(async move {
        if let Err(join_error) = producer_handle.await {
            if join_error.is_panic() {
                tracing::warn!(error = %join_error, "producer task panicked; ignored per pipeline contract");
            }
        }
        if let Err(join_error) = pool_handle.await {
            tracing::error!(error = %join_error, "worker pool driver task failed unexpectedly");
        }
        if let Err(join_error) = bridge_handle.await {
            if join_error.is_panic() {
                tracing::error!(error = %join_error, "cancellation bridge task panicked");
            }
        }
    });

    collector_rx
}

/// As [`map`], but runs to completion and discards every mapper output.
///
/// Equivalent to draining the channel [`map`] returns; present because a
/// caller that only wants the side effects shouldn't have to write the drain
/// loop themselves.
pub async fn map_void<T, U, P, PFut, M, MFut>(producer: P, mapper: M, options: Options)
where
    T: Send + 'static,
    U: Send + 'static,
    P: FnOnce(mpsc::Sender<T>) -> PFut + Send + 'static,
    PFut: Future<Output = ()> + Send + 'static,
    M: Fn(T, Writer<U>) -> MFut + Send + Sync + 'static,
    MFut: Future<Output = ()> + Send + 'static,
{
    let mut collector = map(producer, mapper, options).await;
    while collector.recv().await.is_some() {}
}

async fn drain<T>(source: SourceHandle<T>) {
    let mut receiver = source.lock().await;
    while receiver.recv().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_all(tx: &mpsc::Sender<u32>, items: impl IntoIterator<Item = u32>) {
        for item in items {
            if tx.send(item).await.is_err() {
                return;
            }
        }
    }

    #[tokio::test]
    async fn map_yields_every_transformed_item() {
        let mut collector = map(
            |tx: mpsc::Sender<u32>| async move { write_all(&tx, 1..=5).await },
            |item: u32, writer: Writer<u32>| async move { writer.write(item * 2).await },
            Options::new().workers(2),
        )
        .await;

        let mut seen = Vec::new();
        while let Some(value) = collector.recv().await {
            seen.push(value);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn map_void_drives_side_effects_to_completion() {
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let tally = std::sync::Arc::clone(&counter);

        map_void(
            |tx: mpsc::Sender<u32>| async move { write_all(&tx, 1..=5).await },
            move |item: u32, _writer: Writer<()>| {
                let tally = std::sync::Arc::clone(&tally);
                async move {
                    tally.fetch_add(item as usize, std::sync::atomic::Ordering::SeqCst);
                }
            },
            Options::new().workers(3),
        )
        .await;

        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 15);
    }

    #[tokio::test]
    async fn a_panicking_mapper_does_not_stop_the_others() {
        let mut collector = map(
            |tx: mpsc::Sender<u32>| async move { write_all(&tx, 1..=5).await },
            |item: u32, writer: Writer<u32>| async move {
                if item == 3 {
                    panic!("boom");
                }
                writer.write(item).await;
            },
            Options::new().workers(1),
        )
        .await;

        let mut seen = Vec::new();
        while let Some(value) = collector.recv().await {
            seen.push(value);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 4, 5]);
    }
}

//! The bounded-parallel worker pool that drives mapper tasks to completion.

use crate::cancellation::CancellationToken;
use crate::source::SourceHandle;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

type MapperFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Pull items off `source` and run `mapper` against each, bounded to
/// `workers` concurrent tasks, until the source is exhausted or `done` fires.
///
/// Decoupled from the pipeline's error type: `mapper` is already bound to a
/// specific `Cancel<E>` by the caller, and panics are reported through
/// `on_panic` rather than `pool` knowing anything about `E`.
pub(crate) async fn execute_mappers<T, M>(
    source: SourceHandle<T>,
    workers: usize,
    done: CancellationToken,
    mapper: M,
    on_panic: impl Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
) where
    T: Send + 'static,
    M: Fn(T) -> MapperFuture + Send + Sync + 'static,
{
    let mapper = Arc::new(mapper);
    let on_panic = Arc::new(on_panic);
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    loop {
        let permit = tokio::select! {
            biased;
            () = done.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let item = tokio::select! {
            biased;
            () = done.cancelled() => break,
            item = async {
                let mut receiver = source.lock().await;
                receiver.recv().await
            } => item,
        };

        let Some(item) = item else { break };

        let mapper = Arc::clone(&mapper);
        tasks.spawn(async move {
            let _permit = permit;
            mapper(item).await;
        });

        // Bound the in-flight task set so a burst of immediately-ready
        // permits doesn't let `tasks` grow past what `join_next` can drain
        // promptly; stray panics surface as soon as their task finishes.
        while let Some(result) = tasks.try_join_next() {
            if let Err(join_error) = result {
                if let Some(message) = panic_message(&join_error) {
                    on_panic(message).await;
                }
            }
        }
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(join_error) = result {
            if let Some(message) = panic_message(&join_error) {
                on_panic(message).await;
            }
        }
    }
}

/// Extract a human-readable message from a panicking [`tokio::task::JoinError`].
///
/// Returns `None` for a cancelled-but-not-panicked task (the pool never
/// aborts tasks itself, but a caller's runtime shutdown could still produce
/// one).
pub(crate) fn panic_message(join_error: &tokio::task::JoinError) -> Option<String> {
    if !join_error.is_panic() {
        return None;
    }
    Some(match join_error.to_string().is_empty() {
        true => "mapper task panicked".to_string(),
        false => join_error.to_string(),
    })
}

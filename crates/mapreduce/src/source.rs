//! The producer side of the pipeline: a user-supplied function that pushes
//! items onto a bounded channel for the worker pool to consume.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// The producer's output channel, shared so both the worker pool and a
/// cancellation-triggered drain can read from it.
///
/// Wrapped in a [`tokio::sync::Mutex`] rather than split into a dedicated
/// drain task: the pool already holds the only other reader role, and the two
/// never read concurrently in practice (the pool stops pulling once `done` is
/// cancelled, at which point the drain takes over) — the lock exists to
/// satisfy the type checker, not to arbitrate real contention.
pub(crate) type SourceHandle<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// Spawn the producer and hand back its output channel and join handle.
///
/// The channel has capacity 1, the closest bounded-channel equivalent to an
/// unbuffered Go channel: the producer blocks on every send until a mapper
/// (or the cancellation drain) is ready to receive.
pub(crate) fn build_source<T, P, Fut>(producer: P) -> (SourceHandle<T>, tokio::task::JoinHandle<()>)
where
    T: Send + 'static,
    P: FnOnce(mpsc::Sender<T>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::spawn(async move {
        producer(tx).await;
        // `tx` drops here, closing the channel for good.
    });
    (Arc::new(Mutex::new(rx)), handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn producer_items_are_observable_on_the_handle() {
        let (source, handle) = build_source(|tx: mpsc::Sender<u32>| async move {
            for item in 1..=3 {
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });

        let mut received = Vec::new();
        {
            let mut receiver = source.lock().await;
            while let Some(item) = receiver.recv().await {
                received.push(item);
            }
        }
        handle.await.expect("producer task must not panic");
        assert_eq!(received, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn channel_closes_once_the_producer_returns() {
        let (source, handle) = build_source(|_tx: mpsc::Sender<()>| async move {});
        handle.await.expect("producer task must not panic");
        assert_eq!(source.lock().await.recv().await, None);
    }
}

//! The guarded hand-off port given to mappers and reducers.

use crate::cancellation::CancellationToken;
use tokio::sync::mpsc;

/// A one-shot-per-call send port bound to an external cancellation handle and
/// an internal "done" signal.
///
/// `write` either forwards the value or drops it silently once the pipeline
/// has been cancelled or torn down — it never blocks forever and never sends
/// on a channel nobody is reading from anymore.
pub struct Writer<T> {
    sender: mpsc::Sender<T>,
    external: CancellationToken,
    done: CancellationToken,
}

impl<T> Clone for Writer<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            external: self.external.clone(),
            done: self.done.clone(),
        }
    }
}

impl<T> Writer<T> {
    pub(crate) fn new(
        sender: mpsc::Sender<T>,
        external: CancellationToken,
        done: CancellationToken,
    ) -> Self {
        Self {
            sender,
            external,
            done,
        }
    }

    /// Send `value` downstream, discarding it silently if the pipeline has
    /// already been cancelled or torn down.
    ///
    /// Folds the done/external check into the send itself (rather than a
    /// check-then-send) so a write racing a cancellation is dropped promptly
    /// instead of blocking on a channel nobody will ever drain again.
    pub async fn write(&self, value: T) {
        if self.external.is_cancelled() || self.done.is_cancelled() {
            return;
        }

        tokio::select! {
            () = self.external.cancelled() => {}
            () = self.done.cancelled() => {}
            result = self.sender.send(value) => {
                drop(result);
            }
        }
    }
}

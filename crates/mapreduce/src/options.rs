//! Pipeline tuning knobs shared by [`crate::map_reduce`] and its variants.

use crate::cancellation::CancellationToken;

/// Default worker count when [`Options::workers`] is never called.
pub const DEFAULT_WORKERS: usize = 16;

/// Tuning knobs for a single [`crate::map_reduce`] call.
///
/// Constructed via [`Options::new`] and its builder methods; every field has
/// a usable default, so `Options::new()` alone is a valid configuration.
#[derive(Clone, Debug)]
pub struct Options {
    pub(crate) workers: usize,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Options {
    /// Start from the defaults: [`DEFAULT_WORKERS`] workers, no external
    /// cancellation handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            cancellation: None,
        }
    }

    /// Set the number of concurrent mapper tasks. `0` is clamped up to `1` —
    /// a pipeline with zero workers can never make progress.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Provide an external cancellation handle the caller can trigger to stop
    /// the pipeline from outside any mapper or reducer.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(crate) fn external_token(&self) -> CancellationToken {
        self.cancellation.clone().unwrap_or_default()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

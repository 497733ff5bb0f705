//! Error types returned by the pipeline.

use std::fmt;

/// The error returned by [`crate::map_reduce`] and its variants.
///
/// Generic over `E`, the mapper/reducer's own error type, so a user error is
/// preserved verbatim rather than flattened into a string.
#[derive(Debug)]
pub enum MapReduceError<E> {
    /// A mapper or reducer called `cancel(Some(err))`.
    Cancelled(E),
    /// A mapper or reducer called `cancel(None)`.
    CancelWithNil,
    /// The reducer returned without writing a value.
    ReduceNoOutput,
    /// A mapper or reducer panicked; this carries the panic message.
    Panicked(String),
}

impl<E> MapReduceError<E> {
    /// True for `Cancelled` and `CancelWithNil` — i.e. the pipeline was
    /// explicitly cancelled, as opposed to finishing with nothing to reduce.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::CancelWithNil)
    }
}

impl<E: fmt::Display> fmt::Display for MapReduceError<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled(err) => write!(formatter, "mapreduce cancelled: {err}"),
            Self::CancelWithNil => formatter.write_str("mapreduce cancelled without an error"),
            Self::ReduceNoOutput => {
                formatter.write_str("reducer finished without writing a value")
            },
            Self::Panicked(message) => write!(formatter, "mapreduce panicked: {message}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for MapReduceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cancelled(err) => Some(err),
            Self::CancelWithNil | Self::ReduceNoOutput | Self::Panicked(_) => None,
        }
    }
}

/// Error returned by [`crate::finish`] and [`crate::finish_void`].
///
/// Callbacks passed to `finish` are heterogeneous closures and are therefore
/// already type-erased at the call boundary; their errors are type-erased the
/// same way rather than threading a generic error parameter through a
/// function that by construction cannot have just one concrete error type.
#[derive(Debug, thiserror::Error)]
pub enum FinishError {
    /// A callback returned an error.
    #[error(transparent)]
    Failed(#[from] Box<dyn std::error::Error + Send + Sync>),
    /// A callback panicked.
    #[error("finish callback panicked: {0}")]
    Panicked(String),
}

impl FinishError {
    pub(crate) fn from_mapreduce(
        error: MapReduceError<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match error {
            MapReduceError::Cancelled(err) => Self::Failed(err),
            MapReduceError::Panicked(message) => Self::Panicked(message),
            // `finish`'s internal reducer always writes its sentinel value and
            // never calls `cancel(None)`, so these two cannot be produced by it.
            MapReduceError::CancelWithNil | MapReduceError::ReduceNoOutput => {
                unreachable!("finish's internal wiring never produces {error}")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn display_covers_every_variant() {
        let cancelled: MapReduceError<io::Error> =
            MapReduceError::Cancelled(io::Error::other("boom"));
        assert!(cancelled.to_string().contains("boom"));
        assert!(cancelled.is_cancelled());

        let nil: MapReduceError<io::Error> = MapReduceError::CancelWithNil;
        assert!(nil.is_cancelled());
        assert_eq!(nil.to_string(), "mapreduce cancelled without an error");

        let no_output: MapReduceError<io::Error> = MapReduceError::ReduceNoOutput;
        assert!(!no_output.is_cancelled());

        let panicked: MapReduceError<io::Error> = MapReduceError::Panicked("oops".to_string());
        assert!(panicked.to_string().contains("oops"));
    }

    #[test]
    fn source_only_present_for_cancelled() {
        let cancelled: MapReduceError<io::Error> =
            MapReduceError::Cancelled(io::Error::other("boom"));
        assert!(std::error::Error::source(&cancelled).is_some());

        let panicked: MapReduceError<io::Error> = MapReduceError::Panicked("oops".to_string());
        assert!(std::error::Error::source(&panicked).is_none());
    }

    #[test]
    fn finish_error_converts_cancelled_and_panicked() {
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(io::Error::other("x"));
        let failed = FinishError::from_mapreduce(MapReduceError::Cancelled(boxed));
        assert!(matches!(failed, FinishError::Failed(_)));

        let panicked = FinishError::from_mapreduce(MapReduceError::Panicked("y".to_string()));
        assert!(matches!(panicked, FinishError::Panicked(message) if message == "y"));
    }
}

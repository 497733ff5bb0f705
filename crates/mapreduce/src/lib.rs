//! Bounded-parallel producer/mapper/reducer pipeline with first-error cancellation.
//!
//! Three user-supplied stages — a producer, a per-item mapper, and a reducer
//! — are driven to completion through two bounded channels with a fixed
//! worker count. Any stage can call `cancel` to stop the pipeline early; the
//! first error reported (by `cancel` or a panic) is the one returned.
//!
//! ```
//! use mapreduce::{map_reduce, Options};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let result: Result<u64, mapreduce::MapReduceError<std::io::Error>> = map_reduce(
//!     |tx| async move {
//!         for item in 1..=4u32 {
//!             if tx.send(item).await.is_err() {
//!                 return;
//!             }
//!         }
//!     },
//!     |item, writer, _cancel| async move {
//!         writer.write(u64::from(item * item)).await;
//!     },
//!     |mut collector, writer, _cancel| async move {
//!         let mut total = 0u64;
//!         while let Some(value) = collector.recv().await {
//!             total += value;
//!         }
//!         writer.write(total).await;
//!         collector
//!     },
//!     Options::new().workers(4),
//! )
//! .await;
//!
//! assert_eq!(result.unwrap(), 30);
//! # }
//! ```

#![cfg_attr(not(test), allow(clippy::panic, reason = "orchestrator fatal panic is a documented contract violation path"))]

mod cancel;
mod cancellation;
mod error;
mod finish;
mod map;
mod options;
mod orchestrator;
mod pool;
mod source;
mod writer;

pub use cancel::Cancel;
pub use cancellation::CancellationToken;
pub use error::{FinishError, MapReduceError};
pub use finish::{finish, finish_void, FinishFn, FinishVoidFn};
pub use map::{map, map_void};
pub use options::{Options, DEFAULT_WORKERS};
pub use orchestrator::{map_reduce, map_reduce_void, map_reduce_with_source};
pub use writer::Writer;

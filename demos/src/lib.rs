//! Pipelines shared by the demo binary and its integration tests.

use mapreduce::{map_reduce, MapReduceError, Options};
use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;

const SAMPLE_TEXT: &str =
    "the quick brown fox jumps over the lazy dog while a curious cat watches from the windowsill";

/// Count how many words of each length appear in a fixed sample text.
pub async fn histogram(workers: usize) -> Result<HashMap<usize, usize>, MapReduceError<Infallible>> {
    map_reduce(
        |tx: mpsc::Sender<String>| async move {
            for word in SAMPLE_TEXT.split_whitespace() {
                if tx.send(word.to_string()).await.is_err() {
                    return;
                }
            }
        },
        |word: String, writer, _cancel| async move {
            writer.write(word.chars().count()).await;
        },
        |mut collector: mpsc::Receiver<usize>, writer, _cancel| async move {
            let mut counts: HashMap<usize, usize> = HashMap::new();
            while let Some(length) = collector.recv().await {
                *counts.entry(length).or_insert(0) += 1;
            }
            writer.write(counts).await;
            collector
        },
        Options::new().workers(workers),
    )
    .await
}

/// Simulate `request_count` variable-latency downstream fetches and report
/// the id and latency of the slowest one.
pub async fn slowest_fetch(
    workers: usize,
    request_count: u32,
) -> Result<(u32, Duration), MapReduceError<Infallible>> {
    map_reduce(
        move |tx: mpsc::Sender<u32>| async move {
            for id in 0..request_count {
                if tx.send(id).await.is_err() {
                    return;
                }
            }
        },
        |id: u32, writer, _cancel| async move {
            let latency = Duration::from_millis(u64::from((id % 5) * 15 + 5));
            tokio::time::sleep(latency).await;
            writer.write((id, latency)).await;
        },
        |mut collector: mpsc::Receiver<(u32, Duration)>, writer, _cancel| async move {
            let mut slowest: Option<(u32, Duration)> = None;
            while let Some((id, latency)) = collector.recv().await {
                if slowest.is_none_or(|(_, current)| latency > current) {
                    slowest = Some((id, latency));
                }
            }
            if let Some(result) = slowest {
                writer.write(result).await;
            }
            collector
        },
        Options::new().workers(workers),
    )
    .await
}

//! Runs both demo pipelines end-to-end against the public `mapreduce` API.

#[tokio::test]
async fn histogram_counts_every_word_once() {
    let histogram = mapreduce_demos::histogram(4).await.expect("histogram demo succeeds");

    let total_words: usize = histogram.values().sum();
    assert_eq!(total_words, 17);
    assert!(histogram.values().all(|&count| count > 0));
}

#[tokio::test]
async fn slowest_fetch_reports_the_highest_latency_request() {
    let (id, latency) = mapreduce_demos::slowest_fetch(4, 12)
        .await
        .expect("slowest-fetch demo succeeds");

    assert!(id < 12);
    assert!(latency.as_millis() > 0);
}

#[tokio::test]
async fn slowest_fetch_is_deterministic_across_worker_counts() {
    let (serial_id, serial_latency) = mapreduce_demos::slowest_fetch(1, 12).await.unwrap();
    let (parallel_id, parallel_latency) = mapreduce_demos::slowest_fetch(8, 12).await.unwrap();

    assert_eq!(serial_id, parallel_id);
    assert_eq!(serial_latency, parallel_latency);
}

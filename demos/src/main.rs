//! Example programs exercising the `mapreduce` crate's public API end-to-end.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, ValueEnum)]
enum Demo {
    /// Count word lengths across a fixed block of text.
    Histogram,
    /// Simulate N downstream fetches and report the slowest.
    SlowestFetch,
}

#[derive(Debug, Parser)]
#[command(about = "Example pipelines built on the mapreduce crate")]
struct Cli {
    /// Which demo pipeline to run.
    #[arg(value_enum)]
    demo: Demo,

    /// Worker count passed through to the pipeline.
    #[arg(short, long, default_value_t = mapreduce::DEFAULT_WORKERS)]
    workers: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.demo {
        Demo::Histogram => match mapreduce_demos::histogram(cli.workers).await {
            Ok(histogram) => {
                let mut lengths: Vec<_> = histogram.keys().copied().collect();
                lengths.sort_unstable();
                for length in lengths {
                    println!("{length} letters: {} word(s)", histogram[&length]);
                }
            },
            Err(error) => eprintln!("histogram demo failed: {error}"),
        },
        Demo::SlowestFetch => match mapreduce_demos::slowest_fetch(cli.workers, 12).await {
            Ok((id, latency)) => println!("slowest request was #{id}, took {latency:?}"),
            Err(error) => eprintln!("slowest-fetch demo failed: {error}"),
        },
    }
}

//! Example of using the overlay-peers crawler.

use clap::Parser;
use log::LevelFilter;
use overlay_peers_crawler::export::{save_responses, save_topology, CrawlSummary};
use overlay_peers_crawler::CrawlerBuilder;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Entry node, a bare host or host:port.
    #[arg(short, long)]
    address: String,

    /// Maximum number of simultaneously outstanding requests.
    #[arg(short, long, default_value = "100")]
    concurrent_requests: usize,

    /// Per-request timeout in seconds.
    #[arg(short, long, default_value = "5")]
    timeout: u64,

    /// Write the raw responses, keyed by address, to this file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Write the reconciled peers and edges to this file.
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    // Configure fern logger
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} - {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr())
        .apply()?;

    log::info!("CRAWLING THE OVERLAY NETWORK");
    log::debug!("Using {} concurrent requests", args.concurrent_requests);

    let crawler = CrawlerBuilder::new()
        .with_max_in_flight(args.concurrent_requests)
        .with_request_timeout(Duration::from_secs(args.timeout))
        .build()?;

    let mut handle = crawler.crawl(&args.address).await?;
    while let Some(message) = handle.next_message().await {
        log::debug!("{message}");
    }
    let outcome = handle.finish().await?;

    let topology = outcome.topology();
    log::info!("{}", CrawlSummary::new(&outcome, &topology));

    let degrees = topology.degrees();
    log::info!(
        "average degree in/out/undirected: {:.2}/{:.2}/{:.2}",
        degrees.in_degree_avg,
        degrees.out_degree_avg,
        degrees.undirected_degree_avg
    );

    if let Some(path) = args.snapshot {
        save_responses(path, &outcome)?;
    }
    if let Some(path) = args.topology {
        save_topology(path, &outcome, &topology)?;
    }

    Ok(())
}

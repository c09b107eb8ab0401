use clap::Parser;
use std::process::ExitCode;
use teses_crawler::{Crawl, CrawlerConfig, output};

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match CrawlerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => CrawlerConfig::default(),
    };
    args.apply(&mut config);

    println!("Note: crawling requires a WebDriver server (e.g., geckodriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using {}",
        config.webdriver_url
    );

    let output_path = config.output_path.clone();
    let crawl = Crawl::new(config);

    // Ctrl-C stops the crawl but still writes what was collected
    let cancel = crawl.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ::log::warn!("Interrupted, stopping crawl");
            cancel.cancel();
        }
    });

    let start_time = std::time::Instant::now();
    let outcome = match crawl.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            ::log::error!("Crawl failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let downloaded = outcome.records.iter().filter(|r| r.downloaded).count();
    ::log::info!(
        "Crawl {} - {} records, {} downloaded, in {:.2} seconds",
        if outcome.cancelled { "cancelled" } else { "complete" },
        outcome.records.len(),
        downloaded,
        start_time.elapsed().as_secs_f64()
    );

    if let Err(e) = output::write_csv(&output_path, &outcome.records) {
        ::log::error!("Failed to write {}: {}", output_path, e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

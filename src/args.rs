use clap::Parser;
use std::path::PathBuf;
use teses_crawler::CrawlerConfig;

#[derive(Parser, Debug)]
#[command(name = "teses-crawler")]
#[command(about = "Crawls the STJ \"Jurisprudência em Teses\" index and downloads each edition")]
#[command(version)]
pub struct Args {
    /// JSON configuration file; built-in defaults are used when omitted
    #[arg(short = 'f', long)]
    pub config: Option<PathBuf>,

    /// WebDriver server URL
    #[arg(short, long)]
    pub webdriver_url: Option<String>,

    /// CSV report path
    #[arg(short, long)]
    pub output: Option<String>,

    /// Number of concurrent downloads
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Total timeout in seconds (partial results are written when it passes)
    #[arg(long)]
    pub total_timeout: Option<u64>,

    /// Collect records without downloading them
    #[arg(long, default_value_t = false)]
    pub skip_download: bool,
}

impl Args {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut CrawlerConfig) {
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.download_concurrency = concurrency;
        }
        if let Some(timeout) = self.total_timeout {
            config.total_timeout_secs = Some(timeout);
        }
        if self.skip_download {
            config.skip_download = true;
        }
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use combine_rss_feeds::config::{Config, ConfigError, ConfigOverrides};
use combine_rss_feeds::{feed, output};

/// Every flag can also be supplied through the matching `INPUT_*` variable,
/// which is how GitHub Actions passes `with:` inputs.
#[derive(Parser, Debug)]
#[command(
    name = "combine-rss-feeds",
    version,
    about = "Merge RSS and Atom feeds into one date-sorted RSS 2.0 feed"
)]
struct Args {
    /// Optional TOML config file; flags and environment override it
    #[arg(long, value_name = "FILE", env = "INPUT_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Newline-separated list of feed URLs
    #[arg(long, value_name = "URLS", env = "INPUT_FEEDS")]
    feeds: Option<String>,

    /// Where to write the merged feed [default: combined_feed.xml]
    #[arg(long, value_name = "PATH", env = "INPUT_OUTPUT_FILE")]
    output_file: Option<String>,

    /// Items taken from each feed [default: 10]
    #[arg(long, value_name = "N", env = "INPUT_LIMIT")]
    limit: Option<String>,

    /// Channel title of the merged feed
    #[arg(long, value_name = "TITLE", env = "INPUT_FEED_TITLE")]
    feed_title: Option<String>,

    /// Channel description of the merged feed
    #[arg(long, value_name = "TEXT", env = "INPUT_FEED_DESCRIPTION")]
    feed_description: Option<String>,

    /// Keep only the newest N items after merging (0 = no cap)
    #[arg(long, value_name = "N", env = "INPUT_MAX_ITEMS")]
    max_items: Option<String>,

    /// Feeds fetched concurrently [default: 8]
    #[arg(long, value_name = "N", env = "INPUT_CONCURRENCY")]
    concurrency: Option<String>,

    /// Per-feed request timeout in seconds [default: 30]
    #[arg(long, value_name = "SECS", env = "INPUT_TIMEOUT_SECS")]
    timeout_secs: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            feeds: self.feeds.clone(),
            output_file: self.output_file.clone(),
            limit: self.limit.clone(),
            feed_title: self.feed_title.clone(),
            feed_description: self.feed_description.clone(),
            max_items: self.max_items.clone(),
            concurrency: self.concurrency.clone(),
            timeout_secs: self.timeout_secs.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the summary line
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };
    config.apply(args.overrides());

    if let Err(ConfigError::NoFeeds) = config.validate() {
        eprintln!("Error: No feed URLs provided in INPUT_FEEDS");
        eprintln!();
        eprintln!("Pass newline-separated URLs with --feeds, set INPUT_FEEDS,");
        eprintln!("or list them under `feeds` in a --config file.");
        std::process::exit(1);
    }

    tracing::info!(
        feeds = config.feeds.len(),
        limit = config.limit,
        max_items = ?config.max_items,
        "Merging feeds"
    );

    let client = reqwest::Client::builder()
        .user_agent(concat!("combine-rss-feeds/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let results = feed::fetch_all(&client, &config.feeds, &config.fetch_options()).await;
    let collected = feed::collect_results(results);
    if !collected.failures.is_empty() {
        tracing::warn!(
            failed = collected.failures.len(),
            total = config.feeds.len(),
            "Some feeds were skipped"
        );
    }

    let items = feed::merge(collected.batches, config.max_items);
    let count = items.len();

    let document = output::build_rss(&config.feed_title, &config.feed_description, items);
    output::write_document(&document, &config.output_file).with_context(|| {
        format!(
            "Failed to write merged feed to '{}'",
            config.output_file.display()
        )
    })?;

    println!(
        "Written {} items to {}",
        count,
        config.output_file.display()
    );
    Ok(())
}

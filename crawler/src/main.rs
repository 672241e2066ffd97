use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crawldex_core::IndexStore;
use crawldex_crawler::{CrawlConfig, Crawler, HttpFetcher};
use crawldex_indexer::Indexer;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl pages breadth-first and index their words")]
struct Cli {
    /// Seed URLs
    urls: Vec<String>,
    /// Path to a file with seed URLs (one per line)
    #[arg(long)]
    seeds: Option<String>,
    /// Store directory (created with `indexer init`)
    #[arg(long, default_value = "./index.db")]
    db: String,
    /// Number of breadth-first levels to crawl
    #[arg(long, default_value_t = 2)]
    depth: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// User-Agent string to send
    #[arg(long, default_value = "crawldex-bot/0.1")]
    user_agent: String,
    /// Record links and their anchor words in the link tables
    #[arg(long, default_value_t = false)]
    record_links: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let mut seeds = args.urls.clone();
    if let Some(path) = &args.seeds {
        let file = File::open(path).with_context(|| format!("reading seeds from {path}"))?;
        for line in BufReader::new(file).lines() {
            let s = line?.trim().to_string();
            if s.is_empty() || s.starts_with('#') { continue; }
            seeds.push(s);
        }
    }
    if seeds.is_empty() { return Err(anyhow!("no seeds")); }

    let config = CrawlConfig {
        user_agent: args.user_agent.clone(),
        timeout_secs: args.timeout_secs,
        record_links: args.record_links,
        ..CrawlConfig::default()
    };
    let fetcher = HttpFetcher::new(&config)?;
    let store = IndexStore::open(&args.db).with_context(|| format!("opening store at {}", args.db))?;
    tracing::info!(seeds = seeds.len(), depth = args.depth, db = %args.db, "crawl starting");

    let mut crawler = Crawler::new(Indexer::new(store), fetcher, config);
    let stats = crawler.crawl(&seeds, args.depth).await?;
    crawler.into_indexer().into_store().close()?;

    tracing::info!(
        levels = stats.levels,
        fetched = stats.fetched,
        indexed = stats.indexed,
        failed = stats.failed,
        "crawl done"
    );
    Ok(())
}

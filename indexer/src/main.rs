use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use crawldex_core::IndexStore;
use crawldex_indexer::{Document, Indexer};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;
use walkdir::WalkDir;

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Create and fill a word-location index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index tables in a fresh store
    Init {
        /// Store directory
        #[arg(long, default_value = "./index.db")]
        db: String,
    },
    /// Index local HTML files (a file or a directory walked recursively)
    Index {
        /// Store directory
        #[arg(long, default_value = "./index.db")]
        db: String,
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db } => {
            let store = IndexStore::create(&db).with_context(|| format!("creating store at {db}"))?;
            store.close()?;
            tracing::info!(db = %db, "schema created");
            Ok(())
        }
        Commands::Index { db, input } => index_files(&db, &input),
    }
}

fn index_files(db: &str, input: &str) -> Result<()> {
    let input_path = Path::new(input);
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("html" | "htm")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        return Err(anyhow!("input {input} is neither a file nor a directory"));
    }
    files.sort();

    let store = IndexStore::open(db).with_context(|| format!("opening store at {db}"))?;
    let mut indexer = Indexer::new(store);
    let mut indexed = 0usize;
    for file in &files {
        let absolute = fs::canonicalize(file)?;
        let url = Url::from_file_path(&absolute)
            .map_err(|_| anyhow!("cannot build a file url for {}", absolute.display()))?;
        let bytes = fs::read(&absolute)?;
        let document = match Document::parse(&bytes) {
            Ok(d) => d,
            Err(err) => {
                tracing::warn!(file = %absolute.display(), error = %err, "skipping file");
                continue;
            }
        };
        if indexer.index_page(url.as_str(), &document)? {
            indexed += 1;
        }
    }
    let written = indexer.commit()?;
    indexer.into_store().close()?;

    tracing::info!(files = files.len(), indexed, facts = written, "index complete");
    Ok(())
}

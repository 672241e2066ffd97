use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crawldex_core::{IndexStore, Searcher};
use crawldex_server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Query the word-location index from the shell or over HTTP")]
struct Cli {
    /// Store directory
    #[arg(long, default_value = "./index.db", global = true)]
    db: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print ranked `score<TAB>url` lines for a query
    Query {
        /// Query words
        #[arg(required = true)]
        words: Vec<String>,
        /// Number of results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print only the best match
    Lucky {
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Serve /search and /lucky over HTTP
    Serve {
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { words, top } => {
            let searcher = open_searcher(&cli.db)?;
            for hit in searcher.query(&words.join(" "), top)? {
                println!("{:.6}\t{}", hit.score, hit.url);
            }
            searcher.into_store().close()?;
        }
        Commands::Lucky { words } => {
            let searcher = open_searcher(&cli.db)?;
            if let Some(hit) = searcher.feeling_lucky(&words.join(" "))? {
                println!("{:.6}\t{}", hit.score, hit.url);
            }
            searcher.into_store().close()?;
        }
        Commands::Serve { host, port } => {
            let app = build_app(&cli.db).with_context(|| format!("opening store at {}", cli.db))?;
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(%addr, "server listening");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

fn open_searcher(db: &str) -> Result<Searcher> {
    let store = IndexStore::open(db).with_context(|| format!("opening store at {db}"))?;
    Ok(Searcher::new(store))
}

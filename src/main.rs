use anyhow::Result;
use clap::{Parser, Subcommand};
use fouille::api;
use fouille::config::Config;
use fouille::engine::Engine;
use fouille::stemmer::StemmerKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "File-tree full-text search engine", long_about = None)]
struct Args {
    /// Location of the index database
    #[arg(short, long, default_value = "index.db")]
    database_location: PathBuf,

    /// Stemming algorithm: french, quick or snowball
    #[arg(short, long, default_value = "french")]
    stemmer_type: String,

    /// Stopwords file overriding the built-in list, one word per line
    #[arg(long)]
    stopwords_file: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a directory tree and update the index
    Index { path: PathBuf },
    /// Run a query against the index
    Search {
        query: String,

        /// Print the full response as JSON instead of one line per match
        #[arg(long)]
        json: bool,
    },
    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:3000")]
        listen: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "fouille=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let stemmer: StemmerKind = args.stemmer_type.parse().map_err(anyhow::Error::msg)?;
    let config = Config {
        database_path: args.database_location,
        stemmer,
        stopwords_file: args.stopwords_file,
        verbose: args.verbose,
    };

    match args.command {
        Command::Index { path } => {
            let engine = Engine::open(config)?;
            let report = engine.index_path(&path)?;
            println!(
                "Indexed {} file(s), {} unchanged, {} removed, {} failed",
                report.indexed, report.skipped, report.deleted, report.failed
            );
        }
        Command::Search { query, json } => {
            let engine = Engine::open(config)?;
            let response = engine.search(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            for result in &response.results {
                let date = chrono::DateTime::from_timestamp(result.date, 0)
                    .map(|t| t.date_naive().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("{} - {} - {:.1}%", result.filename, date, result.rank);
            }
            println!(
                "{} result(s) for {}{}",
                response.results.len(),
                response.query,
                if response.from_cache { " (cached)" } else { "" }
            );
        }
        Command::Serve { listen } => {
            let engine = Arc::new(Engine::open(config)?);
            let app = api::create_router(engine);
            let listener = tokio::net::TcpListener::bind(&listen).await?;
            tracing::info!("Listening on {listen}");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use factfeed::{
    config::Config,
    delivery::Deliverer,
    exclusion::ExclusionSet,
    extractor::WebTextExtractor,
    record::BatchMetadata,
    runner::{BatchRunner, terminal},
};
use reqwest::header::HeaderMap;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "factfeed", version, about = "Send fact records to an ingestion endpoint")]
struct Cli {
    /// Ingestion endpoint (overrides FACTFEED_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// CA certificate used to verify the endpoint (overrides FACTFEED_CA_CERT)
    #[arg(long, global = true)]
    ca_cert: Option<PathBuf>,

    /// JSON list of excluded domains (overrides FACTFEED_EXCLUSIONS)
    #[arg(long, global = true)]
    exclusions: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Type facts in one at a time
    Manual,
    /// Scrape pages and send one fact per page
    Scrape {
        /// Page to scrape; repeatable
        #[arg(long = "url")]
        urls: Vec<String>,

        /// File with one URL per line; `#` starts a comment
        #[arg(long)]
        urls_file: Option<PathBuf>,

        /// Tags for every record of the batch (comma-separated)
        #[arg(long)]
        tags: Option<String>,

        /// Related entities for every record of the batch (comma-separated)
        #[arg(long)]
        related: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_env_with(cli.endpoint.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(cli.ca_cert, cli.exclusions);

    let exclusions = ExclusionSet::load(config.exclusions_path());
    let deliverer = Deliverer::new(config.endpoint().clone(), config.tls_config());
    let extractor = WebTextExtractor::new(HeaderMap::new())?;
    let runner = BatchRunner::new(exclusions, extractor, deliverer);

    match cli.command {
        Command::Manual => {
            runner
                .run_manual(terminal::TerminalEntries::new(runner.exclusions()))
                .await;
        }
        Command::Scrape {
            mut urls,
            urls_file,
            tags,
            related,
        } => {
            if let Some(path) = urls_file {
                urls.extend(read_url_list(&path)?);
            }
            if urls.is_empty() {
                anyhow::bail!("no URLs given; use --url or --urls-file");
            }

            let metadata = match (tags, related) {
                (None, None) => terminal::prompt_batch_metadata()
                    .context("Failed to read batch metadata")?,
                (tags, related) => BatchMetadata::from_raw(
                    tags.as_deref().unwrap_or_default(),
                    related.as_deref().unwrap_or_default(),
                ),
            };

            runner.run_urls(&urls, &metadata).await;
        }
    }

    Ok(())
}

fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

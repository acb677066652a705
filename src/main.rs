use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use resales_loader::config::Config;
use resales_loader::infra::{FileFetcher, HttpFetcher, MemorySink};
use resales_loader::logging;
use resales_loader::pipeline::{persist_raw, PipelineDriver};
use resales_loader::ports::FetchPort;
use resales_loader::schema::REAL_ESTATE_SALES;

#[derive(Parser)]
#[command(name = "resales_loader")]
#[command(about = "Connecticut real estate sales CSV ingest pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the runtime configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the source CSV and save the raw snapshot
    Fetch {
        /// Override the source URL from the config file
        #[arg(long)]
        url: Option<String>,
    },
    /// Parse and clean a local CSV file, writing a cleaned JSON snapshot
    Clean {
        /// Path to the CSV file to clean
        #[arg(long)]
        input: String,
    },
    /// Run the full pipeline: fetch, clean, and load into the database
    Run {
        /// Override the source URL from the config file
        #[arg(long)]
        url: Option<String>,
    },
}

async fn fetch_command(config: &Config, url: Option<String>) -> anyhow::Result<()> {
    let url = url.unwrap_or_else(|| config.source.url.clone());
    let fetcher = HttpFetcher::new(config.source.timeout_seconds);

    println!("📡 Fetching {url}...");
    let bytes = fetcher.fetch(&url).await?;
    let path = persist_raw(
        &bytes,
        &config.sink.table,
        Path::new(&config.pipeline.output_dir),
    )?;
    info!(bytes = bytes.len(), file = %path, "raw snapshot saved");
    println!("✅ Saved {} bytes to {path}", bytes.len());
    Ok(())
}

async fn clean_command(config: &Config, input: String) -> anyhow::Result<()> {
    // Clean against an in-memory sink: no database needed, the JSON snapshot
    // is the output.
    let mut driver = PipelineDriver::new(
        Arc::new(FileFetcher::new()),
        Arc::new(MemorySink::new()),
        REAL_ESTATE_SALES.clone(),
        config.pipeline.on_malformed,
    )
    .with_snapshot_dir(&config.pipeline.output_dir);

    let result = driver.run(&input, &config.table()).await?;
    println!("\n📊 Clean results:");
    println!("   Rows parsed: {}", result.rows_parsed);
    println!("   Rows skipped: {}", result.rows_skipped);
    println!("   Cells degraded: {}", result.cells_defaulted);
    if let Some(snapshot) = result.snapshot_file {
        println!("   Snapshot: {snapshot}");
    }
    Ok(())
}

#[cfg(feature = "db")]
async fn run_command(config: &Config, url: Option<String>) -> anyhow::Result<()> {
    use resales_loader::infra::PostgresSink;

    let url = url.unwrap_or_else(|| config.source.url.clone());
    let database_url = Config::database_url()?;
    let sink = PostgresSink::connect(&database_url).await?;

    let mut driver = PipelineDriver::new(
        Arc::new(HttpFetcher::new(config.source.timeout_seconds)),
        Arc::new(sink),
        REAL_ESTATE_SALES.clone(),
        config.pipeline.on_malformed,
    )
    .with_snapshot_dir(&config.pipeline.output_dir);

    let result = driver.run(&url, &config.table()).await?;
    println!("\n📊 Pipeline results:");
    println!("   Run: {}", result.run_id);
    println!("   Rows parsed: {}", result.rows_parsed);
    println!("   Rows skipped: {}", result.rows_skipped);
    println!("   Cells degraded: {}", result.cells_defaulted);
    println!("   Rows loaded: {}", result.rows_loaded);
    Ok(())
}

#[cfg(not(feature = "db"))]
async fn run_command(_config: &Config, _url: Option<String>) -> anyhow::Result<()> {
    anyhow::bail!("the `run` command needs the PostgreSQL sink; rebuild with `--features db`")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (DATABASE_URL lives here, not in config)
    dotenv::dotenv().ok();

    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;

    match cli.command {
        Commands::Fetch { url } => fetch_command(&config, url).await?,
        Commands::Clean { input } => clean_command(&config, input).await?,
        Commands::Run { url } => run_command(&config, url).await?,
    }
    Ok(())
}

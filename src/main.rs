use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use csv_files_api::app::files_use_case::FilesUseCase;
use csv_files_api::config::Config;
use csv_files_api::constants::DEFAULT_CONFIG_PATH;
use csv_files_api::infra::http_client::ReqwestFileSource;
use csv_files_api::observability::{init_logging, init_metrics};
use csv_files_api::server;

#[derive(Parser)]
#[command(name = "csv_files_api")]
#[command(about = "Fetches remote CSV files and serves their validated rows")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Aggregate validated rows and print them as JSON
    Data {
        /// Only this file; it is fetched even if the remote list lacks it
        #[arg(long)]
        file_name: Option<String>,
        /// Keep files without valid rows and null out invalid fields
        #[arg(long)]
        include_empty: bool,
    },
    /// Print the remote file list as JSON
    List {
        /// Only this file; fails if the remote list lacks it
        #[arg(long)]
        file_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config))?;

    let source = ReqwestFileSource::new(&config.source)?;
    let files = Arc::new(
        FilesUseCase::new(Arc::new(source)).with_max_concurrency(config.source.max_concurrency),
    );

    match cli.command {
        Commands::Serve { port } => {
            init_metrics();
            let port = port.unwrap_or(config.server.port);
            info!("Using file source {}", config.source.base_url);
            server::start_server(files, port).await?;
        }
        Commands::Data {
            file_name,
            include_empty,
        } => {
            let records = files
                .aggregate(file_name.as_deref(), include_empty)
                .await
                .map_err(|e| {
                    error!("Aggregation failed: {}", e);
                    e
                })?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::List { file_name } => {
            let list = files.resolve_file_list(file_name.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
    }
    Ok(())
}

mod analyze_cmd;
mod api;
mod config;
mod config_cmd;
mod doctor_cmd;
mod status_cmd;
mod terminal_output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use sightline_config::{config_dir, config_file_path, load_and_prepare};
use sightline_logging::{init_logger, LoggerGuard};

use api::AppState;
use config::Config;

#[derive(Parser)]
#[command(name = "sightline")]
#[command(about = "Sightline: caption, tag and detect objects in images with Azure AI Vision")]
#[command(version)]
struct Cli {
    /// Path to config.yaml (defaults to the config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a local JPEG or PNG image
    Analyze {
        /// Image file (.jpg, .jpeg or .png)
        image: PathBuf,
        /// Vision endpoint URL (overrides config and AZURE_VISION_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,
        /// Subscription key (overrides config and AZURE_VISION_KEY)
        #[arg(long)]
        key: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the HTTP session API
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Query a running server's health
    Status,
    /// Check config, credentials and log directory
    Doctor,
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with secrets redacted
    Show,
    /// Print the config file location
    Path,
    /// Write a starter config file
    Init {
        /// Vision endpoint to record
        #[arg(long)]
        endpoint: Option<String>,
        /// Overwrite an existing file (a backup is kept)
        #[arg(long)]
        force: bool,
    },
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        // These report on the config file itself and print their own findings.
        Commands::Doctor => Ok(exit_code(doctor_cmd::run(&config_path).await?)),
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => config_cmd::show(&config_path).await?,
                ConfigAction::Path => config_cmd::path(&config_path),
                ConfigAction::Init { endpoint, force } => {
                    config_cmd::init(&config_path, endpoint, force).await?
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Analyze {
            image,
            endpoint,
            key,
            json,
        } => {
            let (config, _log_guard) = load_runtime(&config_path).await?;
            let config = Config {
                endpoint: endpoint.or(config.endpoint),
                api_key: key.or(config.api_key),
                ..config
            };
            Ok(exit_code(analyze_cmd::run(&config, &image, json).await?))
        }
        Commands::Serve { port } => {
            let (config, _log_guard) = load_runtime(&config_path).await?;
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status => {
            let (config, _log_guard) = load_runtime(&config_path).await?;
            Ok(exit_code(status_cmd::run(&config).await?))
        }
    }
}

/// Load the file config, overlay env, and start logging.
async fn load_runtime(config_path: &Path) -> Result<(Config, LoggerGuard)> {
    let file = load_and_prepare(config_path).await?;
    let config = Config::from_file_and_env(&file);
    let guard = init_logger(&config.log_dir, &config.log_level);
    Ok((config, guard))
}

async fn run_server(config: Config) -> Result<()> {
    let default_config = config.analysis_config();
    info!(
        port = config.port,
        bind = %config.bind_address,
        timeout_secs = config.timeout.as_secs(),
        credentials_prefilled = default_config.is_complete(),
        "Starting Sightline API"
    );

    let app_state = Arc::new(AppState::new(config.controller(), default_config));
    api::spawn_reaper(Arc::clone(&app_state), api::SESSION_REAP_INTERVAL);
    let app = api::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    let addr = format!("{}:{}", config.bind_address, config.port);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Sightline API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

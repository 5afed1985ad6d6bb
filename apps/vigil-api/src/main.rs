//! vigil front door: one-shot CLI runs and an HTTP run-now endpoint.
//!
//! The binary only loads settings and invokes the engine; everything of
//! substance lives in the `vigil-sync` crate.

mod logging;
mod routes;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(
    name = "vigil-api",
    about = "Tag-driven alert-condition membership reconciliation",
    version
)]
struct Cli {
    /// Remote API key.
    #[arg(short = 'k', long, env = "VIGIL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Remote API base URL.
    #[arg(long, env = "VIGIL_BASE_URL", default_value = "https://api.newrelic.com")]
    base_url: String,

    /// Desired-state configuration file.
    #[arg(short = 'c', long, env = "VIGIL_CONFIG", default_value = "./alert_config.yml")]
    config: PathBuf,

    /// Hours a non-reporting server is retained before deletion.
    #[arg(long, default_value_t = vigil_sync::DEFAULT_RETENTION_HOURS)]
    retention_hours: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single reconciliation pass and exit.
    Run,
    /// Serve the HTTP run-now endpoint.
    Serve {
        /// Listen address.
        #[arg(long, env = "VIGIL_LISTEN", default_value = "0.0.0.0:8080")]
        listen: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();
    let settings = match Settings::load(
        cli.api_key.as_deref(),
        &cli.base_url,
        &cli.config,
        cli.retention_hours,
    ) {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %settings.base_url,
        policies = settings.declarations.len(),
        "starting vigil"
    );

    match cli.command {
        Command::Run => match settings.reconcile().await {
            Ok(summary) => {
                info!(
                    servers_deleted = summary.servers_deleted,
                    entities_added = summary.entities_added,
                    entities_removed = summary.entities_removed,
                    "reconciliation finished"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "reconciliation failed");
                ExitCode::FAILURE
            }
        },
        Command::Serve { listen } => match routes::serve(settings, &listen).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "server error");
                ExitCode::FAILURE
            }
        },
    }
}

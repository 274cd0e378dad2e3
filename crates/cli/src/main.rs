//! Twined functions entry point.
//!
//! This binary is the composition root. It:
//!
//! 1. **Parses configuration** from flags and environment variables and
//!    validates it before anything starts.
//! 2. **Wires observability**: `tracing-subscriber` with JSON or pretty
//!    output, plus an OpenTelemetry OTLP exporter when an endpoint is set.
//! 3. **Constructs infrastructure**: Google credentials, the BigQuery, Pub/Sub
//!    and Artifact Registry adapters, and the Kubernetes client, injected into
//!    the handler selected by the subcommand.
//! 4. **Serves** that handler's router until SIGINT or SIGTERM.
//!
//! One process serves one function:
//!
//! ```text
//! twined-functions event-handler     # Pub/Sub push -> BigQuery (+ Kueue)
//! twined-functions helper            # scheduled topic sweep
//! twined-functions service-registry  # GET /{suid}?revision_tag=
//! ```

mod config;
mod observability;
mod serve;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use crate::config::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let function = cli.command.function_name();
    let telemetry = observability::init(cli.log_format, cli.otlp_endpoint.as_deref(), function)?;

    let result = run(cli, function).await;
    if let Err(error) = &result {
        error!(error = %format!("{error:#}"), function, "Exiting with error.");
    }

    telemetry.shutdown();
    result
}

async fn run(cli: Cli, function: &'static str) -> Result<()> {
    let router = match cli.command {
        Commands::EventHandler(args) => serve::event_handler(args).await?,
        Commands::Helper(args) => serve::helper(args).await?,
        Commands::ServiceRegistry(args) => serve::service_registry(args).await?,
    };

    serve::run(router, cli.port, function).await
}

//! autobucket operator - creates Bucket resources for annotated Deployments

use std::time::Duration;

use clap::{Parser, Subcommand};
use kube::Client;

use autobucket_common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use autobucket_common::DEFAULT_NAME_PREFIX;
use autobucket_controller::{ControllerConfig, ReconcilerConfig};
use autobucket_operator::controller_runner::build_bucket_controller;
use autobucket_operator::startup::{bucket_crd_yaml, ensure_crds_installed};

/// autobucket - derives Bucket resources from Deployment annotations
#[derive(Parser, Debug)]
#[command(name = "autobucket", version, about, long_about = None)]
struct Cli {
    /// Generate the Bucket CRD manifest and exit
    #[arg(long)]
    crd: bool,

    /// Name prefix used when a Deployment sets none
    #[arg(long, env = "AUTOBUCKET_DEFAULT_NAME_PREFIX", default_value = DEFAULT_NAME_PREFIX)]
    default_name_prefix: String,

    /// Seconds to wait before retrying a failed reconciliation
    #[arg(long, env = "AUTOBUCKET_ERROR_REQUEUE_SECS", default_value_t = 30)]
    error_requeue_secs: u64,

    /// Log output format (json or text)
    #[arg(long, env = "AUTOBUCKET_LOG_FORMAT", default_value = "json")]
    log_format: LogFormat,

    /// Do not install the Bucket CRD on startup
    #[arg(long)]
    skip_crd_install: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches Deployments cluster-wide and keeps one Bucket per Deployment
    /// carrying the cloud annotation.
    Controller,
}

impl Cli {
    fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            reconciler: ReconcilerConfig::default()
                .with_default_name_prefix(self.default_name_prefix.clone()),
            error_requeue: Duration::from_secs(self.error_requeue_secs),
            ..ControllerConfig::default()
        }
    }

    fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            format: self.log_format,
            filter: None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        println!("{}", bucket_crd_yaml()?);
        return Ok(());
    }

    init_telemetry(&cli.telemetry_config())?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(&cli).await,
    }
}

async fn run_controller(cli: &Cli) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create Kubernetes client: {}", e))?;

    if cli.skip_crd_install {
        tracing::info!("Skipping CRD installation");
    } else {
        ensure_crds_installed(&client).await?;
    }

    let config = cli.controller_config();
    tracing::info!(
        default_name_prefix = %config.reconciler.default_name_prefix,
        error_requeue_secs = config.error_requeue.as_secs(),
        "Starting autobucket controller"
    );

    build_bucket_controller(client, config).await;

    tracing::info!("autobucket controller shut down");
    Ok(())
}

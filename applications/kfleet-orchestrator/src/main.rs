//! kfleet - fleet maintenance for managed Kubernetes clusters
//!
//! ## Usage
//!
//! ```bash
//! # List clusters eligible for maintenance
//! kfleet list --filter organization_name=acme
//!
//! # Redeploy all EKS clusters, two at a time, cohort by cohort
//! kfleet deploy --filter cluster_type=EKS --parallel 2 --execution-mode batch
//!
//! # Upgrade non-production clusters to 1.30 without touching anything
//! kfleet deploy --filter production=false --target-version 1.30 --dry-run
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kfleet_orchestrator::{
    BatchDeploymentEngine, BatchParameters, ClusterDirectory, ControlPlaneClient, StdinGate,
    parse_filter_pairs, report,
};

/// kfleet: batch deployment and upgrades across a managed cluster fleet
#[derive(Parser)]
#[command(name = "kfleet")]
#[command(about = "Deploy or upgrade managed Kubernetes clusters in batches", long_about = None)]
struct Cli {
    /// Control plane endpoint
    #[arg(long, global = true, env = "KFLEET_API_URL", default_value = "https://api.kfleet.dev")]
    api_url: String,

    /// API key for the control plane
    #[arg(long, global = true, env = "KFLEET_API_TOKEN", default_value = "")]
    api_token: String,

    #[command(subcommand)]
    command: Commands,
}

/// How freed admission slots are handled
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExecutionMode {
    /// Wait for the whole cohort to finish, confirm, then start the next
    Batch,
    /// Refill a slot as soon as a cluster finishes
    OnTheFly,
}

#[derive(Subcommand)]
enum Commands {
    /// List clusters eligible for maintenance
    List {
        /// Field filter, `key=value[,value...]`; repeatable
        #[arg(short, long = "filter")]
        filter: Vec<String>,
    },

    /// Deploy (or upgrade) the selected clusters
    Deploy {
        /// Field filter, `key=value[,value...]`; repeatable
        #[arg(short, long = "filter")]
        filter: Vec<String>,

        /// Ask the control plane for a dry run instead of a real rollout
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of clusters in flight at once
        #[arg(long, default_value_t = kfleet_orchestrator::DEFAULT_PARALLEL_RUN)]
        parallel: usize,

        /// Seconds between status polls
        #[arg(long, default_value_t = kfleet_orchestrator::DEFAULT_REFRESH_DELAY_SECS)]
        refresh_delay: u64,

        /// Admission policy
        #[arg(long, value_enum, default_value = "batch")]
        execution_mode: ExecutionMode,

        /// Upgrade to this Kubernetes version instead of redeploying
        #[arg(long)]
        target_version: Option<String>,

        /// Skip the high-parallelism confirmation
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kfleet=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let client = ControlPlaneClient::new(&cli.api_url, &cli.api_token)?;

    match cli.command {
        Commands::List { filter } => {
            let filters = parse_filter_pairs(&filter)?;
            let clusters = ClusterDirectory::new(&client).list_eligible(&filters).await?;

            if clusters.is_empty() {
                warn!("No clusters match the given filters");
                return Ok(());
            }

            println!("{}", report::cluster_table(&clusters));
            info!("{} cluster(s)", clusters.len());
            Ok(())
        }

        Commands::Deploy {
            filter,
            dry_run,
            parallel,
            refresh_delay,
            execution_mode,
            target_version,
            yes,
        } => {
            let filters = parse_filter_pairs(&filter)?;
            let clusters = ClusterDirectory::new(&client).list_eligible(&filters).await?;

            if clusters.is_empty() {
                warn!("No clusters match the given filters, nothing to do");
                return Ok(());
            }

            info!("🚀 {} cluster(s) selected for maintenance", clusters.len());

            let mut params = BatchParameters::default()
                .with_dry_run(dry_run)
                .with_parallel_run(parallel)
                .with_refresh_delay(Duration::from_secs(refresh_delay))
                .with_complete_batch(matches!(execution_mode, ExecutionMode::Batch))
                .with_suppress_confirmation(yes);
            if let Some(version) = target_version {
                params = params.with_target_version(version);
            }

            let engine = BatchDeploymentEngine::new(params, client, StdinGate)?;
            let batch_report = engine.run(clusters).await?;

            println!("{}", report::render_report(&batch_report));
            info!(
                "✅ Run complete: {} processed, {} pending",
                batch_report.processed.len(),
                batch_report.pending.len()
            );
            Ok(())
        }
    }
}

mod commands;
mod context;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use context::Context;
use natgate_cloud::{CancelSignal, Reconciler, StateManager};
use natgate_cloud_aws::Ec2RemoteClient;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "natgate")]
#[command(about = "Declarative NAT gateway lifecycle for AWS", long_about = None)]
struct Cli {
    /// Manifest path (default: discovered from the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// AWS region (overrides the manifest)
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Directory holding .natgate/state.json (default: current directory)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what apply would change
    Plan {
        /// Gateway name (default: all)
        name: Option<String>,
    },
    /// Create, update, replace and delete gateways to match the manifest
    Apply {
        /// Gateway name (default: all)
        name: Option<String>,
        /// Execute without confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the live state of tracked gateways
    Show {
        /// Gateway name (default: all)
        name: Option<String>,
    },
    /// Delete tracked gateways
    Destroy {
        /// Gateway name (default: all)
        name: Option<String>,
        /// Execute without confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Adopt an existing NAT gateway
    Import {
        /// Gateway name to track it under
        name: String,
        /// NAT gateway id (nat-...)
        id: String,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("natgate=info")),
        )
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("natgate {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let manifest_path = match cli.config {
        Some(path) => path,
        None => natgate_config::find_manifest_file()?,
    };
    let manifest = natgate_config::load_manifest(&manifest_path)?;
    tracing::debug!("Loaded manifest {}", manifest_path.display());

    let project_root = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let region = cli.region.or_else(|| manifest.region.clone());
    let client = Ec2RemoteClient::from_env(region).await;

    let (cancel_tx, cancel) = CancelSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "⚠ Interrupted, cancelling running waits...".yellow());
            let _ = cancel_tx.send(true);
        }
    });

    let reconciler = Reconciler::new(Arc::new(client))
        .with_tag_config(manifest.tag_config())
        .with_create_policy(manifest.create_policy())
        .with_delete_policy(manifest.delete_policy())
        .with_cancel(cancel);

    let ctx = Context::new(manifest, reconciler, StateManager::new(&project_root));

    match cli.command {
        Commands::Plan { name } => commands::plan::handle(&ctx, name.as_deref()).await,
        Commands::Apply { name, yes } => commands::apply::handle(&ctx, name.as_deref(), yes).await,
        Commands::Show { name } => commands::show::handle(&ctx, name.as_deref()).await,
        Commands::Destroy { name, yes } => {
            commands::destroy::handle(&ctx, name.as_deref(), yes).await
        }
        Commands::Import { name, id } => commands::import::handle(&ctx, &name, &id).await,
        Commands::Version => unreachable!("Version is handled before config loading"),
    }
}

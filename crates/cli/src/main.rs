use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sitepipe_core::site_manager::{SiteManager, SiteManagerConfig, DEFAULT_TARGET};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Sitepipe - A static-site build orchestrator
#[derive(Parser)]
#[command(name = "sitepipe")]
#[command(about = "Build, serve and publish a static site")]
#[command(version)]
struct Cli {
    /// Path to the site root (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    site: PathBuf,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a target and everything it depends on
    Run {
        /// Task or composite target, e.g. "build" or "build:gh-pages"
        #[arg(default_value = DEFAULT_TARGET)]
        target: String,
    },
    /// Show the execution plan for targets without running them
    Plan {
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// List registered tasks
    List,
    /// Show the task dependency graph
    Graph,
    /// Run the default pipeline, then rebuild on changes with live reload
    Watch,
    /// Print the JSON schema of .sitepipe/pipeline.yml
    Schema,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "sitepipe=debug" } else { "sitepipe=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Cancel `token` on the first Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current task");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Needs no site
    if let Commands::Schema = cli.command {
        return commands::schema::execute();
    }

    // Initialize site manager with all business logic
    let manager = SiteManager::new(SiteManagerConfig {
        site_root: cli.site,
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize site: {}", e))?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    // Execute command (CLI layer only handles presentation)
    match cli.command {
        Commands::Run { target } => commands::run::execute(&manager, &target, cancel).await,
        Commands::Plan { targets } => commands::plan::execute(&manager, &targets),
        Commands::List => commands::list::execute(&manager),
        Commands::Graph => commands::graph::execute(&manager),
        Commands::Watch => commands::watch::execute(&manager, cancel).await,
        Commands::Schema => commands::schema::execute(),
    }
}

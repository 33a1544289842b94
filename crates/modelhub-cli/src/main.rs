//! Modelhub CLI - Command-line front end for the modelhub model manager.

use clap::{Parser, Subcommand};
use modelhub_api::ClientConfig;

mod commands;

use commands::{auth, bundles, config, downloads, files, models, notifications, workflows};

/// Modelhub - Manage models, bundles and workflows on a modelhub backend
#[derive(Parser)]
#[command(name = "modelhub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend URL (overrides MODELHUB_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Bearer token (overrides the stored token and MODELHUB_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse, download and delete models
    Models {
        #[command(subcommand)]
        command: models::ModelsCommand,
    },

    /// Manage and install bundles
    Bundles {
        #[command(subcommand)]
        command: bundles::BundlesCommand,
    },

    /// List and upload workflows
    Workflows {
        #[command(subcommand)]
        command: workflows::WorkflowsCommand,
    },

    /// Browse and manage files under the backend's base directory
    Files {
        #[command(subcommand)]
        command: files::FilesCommand,
    },

    /// Watch downloads already running on the backend
    Downloads,

    /// Show or change backend settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommand,
    },

    /// Store a bearer token for later commands
    Login {
        /// Token issued by the backend
        token: String,
    },

    /// Forget the stored bearer token
    Logout,

    /// Show recent notifications
    Notifications {
        /// Remove all stored notifications
        #[arg(long)]
        clear: bool,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.url {
        config.base_url = url;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }
    let ctx = commands::Context::new(config)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| miette::miette!("Failed to start async runtime: {}", e))?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Models { command } => models::run(&ctx, command).await,
            Commands::Bundles { command } => bundles::run(&ctx, command).await,
            Commands::Workflows { command } => workflows::run(&ctx, command).await,
            Commands::Files { command } => files::run(&ctx, command).await,
            Commands::Downloads => downloads::run(&ctx).await,
            Commands::Config { command } => config::run(&ctx, command).await,
            Commands::Login { token } => auth::login(&ctx, &token),
            Commands::Logout => auth::logout(&ctx),
            Commands::Notifications { clear } => notifications::run(&ctx, clear),
        }
    })
}

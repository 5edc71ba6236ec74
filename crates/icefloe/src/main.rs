mod commands;
mod deploy;
mod network;
mod storage;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "icefloe")]
#[command(about = "Provision the Antarctica homelab VM and publish its facts", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the stack configuration file (skips discovery)
    #[arg(short, long, global = true, env = "ICEFLOE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the VM, ensure DNS records, and write stack outputs
    Up,
    /// Validate the configuration and probe the Proxmox API and secrets store
    Check,
    /// Print the outputs written by the last `up`
    Outputs {
        /// Print secret values instead of redacting them
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Up => commands::up::handle(cli.config.as_deref()).await,
        Commands::Check => commands::check::handle(cli.config.as_deref()).await,
        Commands::Outputs { show_secrets } => commands::outputs::handle(show_secrets).await,
    }
}

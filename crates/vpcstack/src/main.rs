mod commands;
mod project;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vpcstack")]
#[command(
    about = "Two-tier VPC stack: public and private subnets, gateways, firewall policies and instances",
    long_about = None
)]
struct Cli {
    /// Settings file (defaults to stack.kdl discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the resource graph and write the stack document
    Synth {
        /// Key pair attached to both instances (falls back to $key_pair_file_name)
        #[arg(short, long)]
        key_pair: Option<String>,
        /// Output directory (default: ./.vpcstack/out)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print the document instead of writing it
        #[arg(long, conflicts_with = "out")]
        stdout: bool,
    },
    /// Check the resource graph and print diagnostics
    Validate {
        /// Key pair attached to both instances (falls back to $key_pair_file_name)
        #[arg(short, long)]
        key_pair: Option<String>,
        /// Fail when no key pair is configured
        #[arg(long)]
        require_key_pair: bool,
    },
    /// Print creation order and dependency edges
    Graph {
        /// Key pair attached to both instances (falls back to $key_pair_file_name)
        #[arg(short, long)]
        key_pair: Option<String>,
        /// Print the graph as JSON
        #[arg(long)]
        json: bool,
    },
    /// Preview changes against the applied-state record
    Diff {
        /// Key pair attached to both instances (falls back to $key_pair_file_name)
        #[arg(short, long)]
        key_pair: Option<String>,
        /// Applied-state file (default: ./.vpcstack/state.json)
        #[arg(short, long)]
        state: Option<PathBuf>,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries documents, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Synth {
            key_pair,
            out,
            stdout,
        } => {
            let settings = project::load_settings(config)?;
            commands::synth::handle(&settings, key_pair, out, stdout).await?;
        }
        Commands::Validate {
            key_pair,
            require_key_pair,
        } => {
            let settings = project::load_settings(config)?;
            commands::validate::handle(&settings, key_pair, require_key_pair)?;
        }
        Commands::Graph { key_pair, json } => {
            let settings = project::load_settings(config)?;
            commands::graph::handle(&settings, key_pair, json)?;
        }
        Commands::Diff { key_pair, state } => {
            let settings = project::load_settings(config)?;
            commands::diff::handle(&settings, key_pair, state).await?;
        }
        Commands::Version => {
            println!("vpcstack {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

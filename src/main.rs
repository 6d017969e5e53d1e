//! xnode - masternode server node.
//!
//! Entry point: CLI parsing, tracing setup, and node boot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use xnode_kernel::CancellationToken;

mod config;
mod error;
mod features;
mod node;

use config::NodeConfig;

/// xnode CLI.
#[derive(Parser)]
#[command(name = "xnode")]
#[command(about = "Masternode server node")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/xnode.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the node (default)
    Run,
    /// Print the effective configuration and exit
    Config,
}

fn init_tracing(config: &NodeConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_dir {
        Some(log_dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "xnode.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("xnode: {e}");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config => {
            println!("{config:#?}");
        }
        Commands::Run => {
            let _log_guard = init_tracing(&config);
            info!(config = %cli.config.display(), "starting xnode");

            let shutdown = CancellationToken::new();
            {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("ctrl-c received");
                        shutdown.cancel();
                    }
                });
            }

            if let Err(e) = node::run(config, shutdown).await {
                error!(error = %e, "node failed");
                std::process::exit(1);
            }
        }
    }
}

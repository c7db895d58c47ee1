//! ImpactHub CLI
//!
//! Command-line interface for running the ImpactHub governance node.

use clap::{Parser, Subcommand};
use impacthub_node::{ImpactHubNode, LogFormat, NodeConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "impacthub")]
#[command(author = "ImpactHub Contributors")]
#[command(version)]
#[command(about = "ImpactHub - community governance, voting and reputation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Configuration file path
        #[arg(short, long, env = "IMPACTHUB_CONFIG", default_value = "impacthub.toml")]
        config: PathBuf,

        /// Listen address, overrides the config file
        #[arg(short, long)]
        address: Option<String>,

        /// Seed the store with a demo community
        #[arg(long)]
        demo: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file path
        #[arg(short, long, env = "IMPACTHUB_CONFIG", default_value = "impacthub.toml")]
        config: PathBuf,
    },
}

fn init_logging(config: &NodeConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            address,
            demo,
        } => {
            let mut node_config = NodeConfig::load(Some(&config))?;
            if let Some(address) = address {
                node_config.server.address = address;
            }
            init_logging(&node_config, cli.verbose);

            tracing::info!("ImpactHub v{}", env!("CARGO_PKG_VERSION"));
            if config.exists() {
                tracing::info!("Config: {:?}", config);
            } else {
                tracing::info!("Config: defaults ({:?} not found)", config);
            }

            let node = ImpactHubNode::new(node_config)?;
            if demo {
                node.seed_demo().await?;
            }
            node.run().await?;
        }

        Commands::Config { config } => {
            let node_config = NodeConfig::load(Some(&config))?;
            print!("{}", node_config.to_toml()?);
        }
    }

    Ok(())
}

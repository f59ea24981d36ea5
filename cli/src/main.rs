//! `alog`: log an event to Auditor, or list recent events
//!
//! With a message, a single event is created and closed immediately:
//!
//! ```text
//! alog --tags deploy,web --level 2 deployed web to production
//! ```
//!
//! Without a message, recent events are listed (`--offset`, `--limit`).

use anyhow::{Context, Result};
use auditor_client::{Auditor, ClientConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

#[derive(Parser, Debug)]
#[command(name = "alog")]
#[command(about = "Log or retrieve events in Auditor", long_about = None)]
#[command(version)]
pub struct Cli {
    /// A message to log to Auditor
    #[arg(num_args = 0..)]
    pub message: Vec<String>,

    /// The amount of records to return
    #[arg(long, default_value = "15")]
    pub limit: u32,

    /// The offset for records to return
    #[arg(long, default_value = "0")]
    pub offset: u64,

    /// Tags to apply to the message (comma-separated, repeatable)
    #[arg(long)]
    pub tags: Vec<String>,

    /// User to record instead of the current one
    #[arg(long, env = "AUDITOR_USER")]
    pub user: Option<String>,

    /// Level to apply to the message
    #[arg(long)]
    pub level: Option<i32>,

    /// Configuration file (defaults to ./auditor.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Auditor host (overrides configuration)
    #[arg(long)]
    pub host: Option<String>,

    /// Auditor port (overrides configuration)
    #[arg(long)]
    pub port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let auditor = Auditor::new(load_config(&cli)?).context("Failed to create Auditor client")?;

    if cli.message.is_empty() {
        commands::list::run(&auditor, &cli).await
    } else {
        commands::log::run(&auditor, &cli).await
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config =
        ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    Ok(config)
}

/// Filter used when `RUST_LOG` is not set
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

//! hyperatomic daemon (v1)
//!
//! Accepts newline-delimited TCP messages, answers each with `ACK`, and
//! records traffic through an asynchronous log pipeline whose level can be
//! changed at runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────┐
//!                   │                   HYPERATOMIC                     │
//!                   │                                                   │
//!   TCP client      │  ┌──────────┐   ┌──────────┐   ┌──────────────┐  │
//!   ────────────────┼─▶│ listener │──▶│  server  │──▶│ handler per  │  │
//!   ◀── "ACK\n" ────┼──│          │   │ JoinSet  │   │ connection   │  │
//!                   │  └──────────┘   └──────────┘   └──────┬───────┘  │
//!                   │                                       │ log call  │
//!                   │                                       ▼           │
//!                   │  ┌──────────┐  current()  ┌────────────────────┐  │
//!                   │  │  config  │────────────▶│   log pipeline     │  │
//!                   │  │ ArcSwap  │             │ queue → writer task│──┼──▶ log file
//!                   │  └────▲─────┘             └────────────────────┘  │
//!                   │       │ publish                                   │
//!                   │  ┌────┴─────┐   ┌──────────────────────────────┐  │
//!                   │  │ watcher  │   │ lifecycle: signals, shutdown │  │
//!                   │  └──────────┘   └──────────────────────────────┘  │
//!                   └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use hyperatomic::config::loader::default_config_path;
use hyperatomic::lifecycle::startup;
use hyperatomic::observability::console::init_console;

#[derive(Parser)]
#[command(name = "hyperatomic", version)]
#[command(about = "Line-oriented TCP daemon with live-reloadable logging", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/hyperatomic/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_console();

    tracing::info!("hyperatomic v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.unwrap_or_else(default_config_path);
    if let Err(e) = startup::run(&config_path).await {
        tracing::error!(error = %e, "Startup failed");
        return Err(e.into());
    }

    Ok(())
}

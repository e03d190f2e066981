//! Caching reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────┐
//!                  │                  CACHING PROXY                   │
//!                  │                                                  │
//!   Client Request │  ┌─────────┐    ┌──────────┐    ┌────────────┐  │
//!   ───────────────┼─▶│  http   │───▶│ handler  │───▶│   cache    │  │
//!                  │  │ server  │    │          │    │  (tiered)  │  │
//!                  │  └─────────┘    └────┬─────┘    └──┬──────┬──┘  │
//!                  │                      │ miss        │      │     │
//!                  │                      ▼             ▼      ▼     │
//!                  │               ┌────────────┐  ┌──────┐ ┌─────┐  │
//!   Client Response│               │   origin   │  │local │ │redis│  │
//!   ◀──────────────┼───────────────│   client   │  │ LRU  │ │tier │  │
//!                  │               └─────┬──────┘  └──────┘ └─────┘  │
//!                  └─────────────────────┼────────────────────────────┘
//!                                        ▼
//!                                  Origin Server
//! ```

use std::path::PathBuf;

use clap::Parser;

use caching_proxy::lifecycle::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "caching-proxy")]
#[command(about = "Caching reverse proxy for a single origin server", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Origin server, e.g. http://localhost:3000 or localhost:3000
    #[arg(long, required_unless_present = "clear_cache")]
    origin: Option<String>,

    /// Clear both cache tiers and exit
    #[arg(long)]
    clear_cache: bool,

    /// Path of the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    lifecycle::run(StartupOptions {
        port: cli.port,
        origin: cli.origin,
        clear_cache: cli.clear_cache,
        config_path: cli.config,
    })
    .await?;

    Ok(())
}

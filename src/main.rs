//! Media relay (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                  MEDIA RELAY                  │
//!                         │                                               │
//!   Player request        │  ┌─────────┐   ┌───────────┐   ┌───────────┐  │
//!   ──────────────────────┼─▶│   net   │──▶│   http    │──▶│ intercept │  │
//!                         │  │listener │   │  server   │   │ classify  │  │
//!                         │  └─────────┘   └───────────┘   └─────┬─────┘  │
//!                         │                       media ┌────────┴──┐     │
//!                         │                             ▼           ▼     │
//!                         │                      ┌───────────┐  passthrough
//!                         │                      │  headers  │      │     │
//!                         │                      │  rewrite  │      │     │
//!                         │                      └─────┬─────┘      │     │
//!                         │                            ▼            ▼     │
//!   Player response       │  ┌──────────┐       ┌───────────────────────┐ │
//!   ◀─────────────────────┼──│ cache /  │◀──────│    upstream client    │◀┼── CDN
//!                         │  │ fallback │       └───────────────────────┘ │
//!                         │  └──────────┘                                 │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use media_relay::lifecycle::startup;

#[derive(Parser)]
#[command(name = "media-relay")]
#[command(about = "Header-rewriting relay for media CDN requests", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    startup::run(args.config).await?;
    Ok(())
}

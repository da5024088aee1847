#!/usr/bin/env cargo
//! Blueprint Gateway Binary
//!
//! Serves `POST /api/generate` and the generated archives.
//!
//! # Usage
//! ```bash
//! blueprint-gateway [--port 3000] [--host 127.0.0.1] [--output-dir ./output] [--config gateway.json] [--verbose]
//! ```
//!
//! Settings come from the environment (and `.env`) unless `--config` names a
//! JSON file. Command-line flags override both.

use blueprint_gateway::{Gateway, GatewayConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Blueprint Gateway - Natural-language to Express/Mongoose project skeletons
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Root directory for projects and archives (overrides OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// JSON configuration file to read instead of the environment
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(args.verbose)
        .init();

    let mut config = match &args.config {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::from_env()?,
    };
    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(output_dir) = args.output_dir {
        config = config.with_output_dir(output_dir);
    }
    config.validate()?;

    print_banner(&config);

    let gateway = Gateway::new(config)?;
    gateway.start().await?;

    Ok(())
}

fn print_banner(config: &GatewayConfig) {
    println!();
    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║                                                               ║");
    println!("║                  BLUEPRINT GATEWAY  v{:<24} ║", blueprint_gateway::VERSION);
    println!("║                                                               ║");
    println!("║     Describe an API, download an Express + Mongoose project   ║");
    println!("║                                                               ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!("📡 HTTP Server");
    println!("   └─ http://{}:{}", config.host, config.port);
    println!();
    println!("🔗 Endpoints");
    println!("   ├─ POST /api/generate      - Generate a project");
    println!("   ├─ GET  /downloads/<name>  - Download an archive");
    println!("   └─ GET  /health            - Health check");
    println!();
    println!("🤖 Provider");
    println!("   ├─ {}", config.provider.base_url);
    println!("   └─ model {}", config.provider.model);
    println!();
    println!("─────────────────────────────────────────────────────────────────");
    println!("Press Ctrl+C to stop the gateway");
    println!();
}

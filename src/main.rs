//! Reboot trigger service.
//!
//! Exposes one secret HTTPS path that reboots the host when called with the
//! right `x-api-key`. Every other request is audited and its connection closed
//! without a reply.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────▶ net (listener + TLS) ──▶ http (router, fail-closed wrapper)
//!                                               │
//!                                               ▼
//!                                    security::rate_limit (per-IP window)
//!                                               │
//!                                               ▼
//!                                    trigger::handler ──▶ audit (JSON + attempt log)
//!                                               │
//!                                  security::auth (constant-time check)
//!                                               │
//!                                               ▼
//!                                    action (platform reboot command)
//! ```

use std::path::PathBuf;

use clap::Parser;

use reboot_trigger::config::load_config;
use reboot_trigger::lifecycle;
use reboot_trigger::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "reboot-trigger")]
#[command(about = "Reboot this host through an authenticated HTTPS request", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "REBOOT_TRIGGER_CONFIG")]
    config: Option<PathBuf>,

    /// Start with the built-in secret when no TOKEN is configured.
    #[arg(long)]
    allow_insecure_default_token: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = load_config(args.config.as_deref(), args.allow_insecure_default_token)?;
    init_logging(&loaded.config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %loaded.config.listener.bind_address(),
        rate_limit = loaded.config.rate_limit.max_requests,
        window_secs = loaded.config.rate_limit.window_secs,
        "reboot-trigger starting"
    );

    lifecycle::run(loaded).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

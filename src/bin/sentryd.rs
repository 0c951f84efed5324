//! sentryd - presence-sentry daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured capture device
//! 2. Samples every Nth frame through the detector backend
//! 3. Debounces presence against the configured hold duration
//! 4. On a trigger, snapshots the frame, serves it on an ephemeral
//!    endpoint, and posts the webhook notification
//! 5. Keeps `current.jpg` overwritten for external pollers

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use presence_sentry::{config::SentryConfig, detect, ingest, Sentry};

#[derive(Parser, Debug)]
#[command(name = "sentryd", version, about = "debounced object-presence notifications")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "SENTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Capture device override (stub:// or http(s)://).
    #[arg(long, env = "SENTRY_DEVICE")]
    device: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = SentryConfig::load_from(args.config.as_deref())
        .context("configuration error, refusing to start")?;
    if let Some(device) = args.device {
        cfg.device = device;
    }

    log::info!(
        "sentryd {} watching '{}' on {} (webhook configured)",
        env!("CARGO_PKG_VERSION"),
        cfg.target_label,
        cfg.device
    );

    let source = ingest::from_device(&cfg.device)?;
    let detector = detect::from_config(&cfg)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown signal received");
        shutdown_handler.store(true, Ordering::SeqCst);
    })
    .context("install shutdown handler")?;

    let mut sentry = Sentry::new(&cfg, source, detector)?;
    let stats = sentry.run(&shutdown)?;
    log::info!(
        "done: {} frames, {} triggers, {} notifications",
        stats.frames_seen,
        stats.triggers,
        stats.notifications_sent
    );
    Ok(())
}

//! Tracing setup. Since the renderer owns stdout for raw ANSI painting,
//! logs always go to a file — never stderr, which would corrupt the
//! alternate screen.

use std::path::PathBuf;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber, returning the log file path on
/// success. Failure to open the log file disables logging entirely rather
/// than falling back to stderr.
pub fn init(verbose: bool) -> Option<PathBuf> {
    let log_dir = dirs::config_dir()?.join("harness-mux").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;

    let pid = std::process::id();
    let log_path = log_dir.join(format!("harness-mux.{pid}.log"));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("harness_mux=trace,info")
        } else {
            EnvFilter::new("harness_mux=debug,info")
        }
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);

    tracing_subscriber::registry().with(filter).with(file_layer).init();

    tracing::info!(path = ?log_path, "logging initialized");
    Some(log_path)
}

//! Tracing subscriber setup.

use anyhow::{Context, Result};
use en_buddy_infrastructure::EnBuddyPaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "EN_BUDDY_LOG";

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    // Fall back to `warn` if neither variable is set or valid.
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber. Logs go to stderr, or to a daily
/// rolling file under the config directory when `log_file` is set. The
/// returned guard must be held until exit so buffered lines are flushed.
pub fn init(verbose: bool, log_file: bool) -> Result<Option<WorkerGuard>> {
    if !log_file {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter(verbose))
            .with_writer(std::io::stderr)
            .try_init();
        return Ok(None);
    }

    let log_dir = EnBuddyPaths::log_dir().context("Failed to resolve log directory")?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, "en-buddy.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(writer)
        .with_ansi(false)
        .try_init();

    Ok(Some(guard))
}

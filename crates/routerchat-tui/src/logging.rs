//! File logging. The terminal belongs to the UI, so log records go to
//! `<log_dir>/routerchat.log` and only when a filter is configured.

use anyhow::{Context, Result};
use routerchat_core::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "routerchat.log";

/// Install the global subscriber. The returned guard must be held until
/// exit so buffered records are flushed.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>> {
    let Some(filter) = config.log_filter.as_deref() else {
        return Ok(None);
    };
    let Some(log_dir) = config.log_dir.as_ref() else {
        return Ok(None);
    };

    let env_filter = match filter.parse::<EnvFilter>() {
        Ok(f) => f,
        Err(e) => {
            eprintln!(
                "WARN: ROUTERCHAT_LOG='{}' is not a valid tracing filter ({}); falling back to 'info'",
                filter, e
            );
            EnvFilter::new("info")
        }
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Could not create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Could not install log subscriber: {}", e))?;

    Ok(Some(guard))
}

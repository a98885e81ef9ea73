use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps the background log writer alive; dropping it flushes any buffered
/// file output.
pub struct LogGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Filter directives for the engine's own targets.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "cadenza=debug,warn"
    } else {
        "cadenza=info,warn"
    }
}

/// Install the global tracing subscriber.
///
/// `filter` uses `EnvFilter` directive syntax (see [`default_filter`]).
/// With `log_dir`, a daily-rolling `cadenza.log` is written there in
/// addition to console output. Fails if a subscriber is already installed.
pub fn init_logging(log_dir: Option<&Path>, filter: &str) -> Result<LogGuard> {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));

    if let Some(dir) = log_dir {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "cadenza.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        registry
            .with(fmt::layer().with_target(true))
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .try_init()?;
        Ok(LogGuard {
            _file_writer: Some(guard),
        })
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
        Ok(LogGuard { _file_writer: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info;

    #[test]
    fn file_logging_writes_a_rolling_log() {
        let dir = tempfile::tempdir().unwrap();
        let guard = init_logging(Some(dir.path()), default_filter(true)).unwrap();
        info!("battle engine online");
        drop(guard); // flushes the non-blocking writer

        let mut logs: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("cadenza.log"))
            .collect();
        assert_eq!(logs.len(), 1);
        let content = std::fs::read_to_string(logs.remove(0).path()).unwrap();
        assert!(content.contains("battle engine online"));

        // The subscriber slot is global; a second install must fail
        // instead of silently replacing it.
        assert!(init_logging(None, default_filter(false)).is_err());
    }
}

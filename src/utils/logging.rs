//! Logging setup and output directory layout

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_PREFIX: &str = "solana-mev-sim.log";

pub struct LoggingGuard {
    pub _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Console plus hourly-rolling file output under `log_dir`. `RUST_LOG` overrides the
/// default `info` level. Hold the returned guard until exit so buffered lines are flushed.
pub fn setup_logging(log_dir: &Path) -> Result<Arc<LoggingGuard>> {
    let file_appender = tracing_appender::rolling::hourly(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_ansi(true)
                .with_level(true)
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_level(true)
                .with_ansi(false)
                .compact()
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse()?)
        )
        .try_init()?;

    Ok(Arc::new(LoggingGuard { _guard: guard }))
}

pub fn setup_output_directories(root: &Path) -> Result<()> {
    use std::fs;

    fs::create_dir_all(root.join("logs"))?;
    fs::create_dir_all(root.join("opportunities"))?;
    fs::create_dir_all(root.join("executions"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_output_layout() {
        let dir = tempfile::tempdir().unwrap();
        setup_output_directories(dir.path()).unwrap();
        for sub in ["logs", "opportunities", "executions"] {
            assert!(dir.path().join(sub).is_dir());
        }
    }
}

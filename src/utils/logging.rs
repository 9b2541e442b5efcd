use anyhow::{Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the filter directive string from config: the base level followed by
/// `module=level` overrides.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.to_string();
    for (module, level) in &config.module_levels {
        filter_str.push_str(&format!(",{}={}", module, level));
    }
    filter_str
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured levels. With a log directory
/// configured, output goes to a daily-rotating file through a non-blocking
/// writer and the returned guard must be kept alive for the program's lifetime;
/// otherwise logs go to stderr and no guard is returned.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::try_new(filter_directives(config))
            .map_err(|e| anyhow!("invalid logging filter: {}", e))?,
    };

    match config.log_directory.as_deref() {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "manhwa-reader.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact()
                .try_init()
                .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;

            tracing::info!(log_dir, "File logging initialized");
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))?;
            Ok(None)
        }
    }
}

use anyhow::Context;
use tracing_appender::{non_blocking::WorkerGuard, rolling};

use crate::config::LogConfig;

/// Installs the global subscriber: a daily rolling `<name>.log` under the
/// configured directory, or stderr. Keep the returned guard alive until exit.
pub fn init_logging(name: &str, config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let Some(dir) = config.dir.as_ref() else {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_max_level(config.level)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log dir {}", dir.display()))?;
    let file_appender = rolling::daily(dir, format!("{name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_max_level(config.level)
        .init();

    Ok(Some(guard))
}

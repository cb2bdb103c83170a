/// File logging for the admin tool.
///
/// Logs are stored under `{data_dir}/logs/`. Each invocation appends to the
/// same file, starting with a separator line.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "poetry-admin.log";

/// Path of the log file for a data directory.
pub fn log_file(data_dir: &Path) -> PathBuf {
    data_dir.join("logs").join(LOG_FILE_NAME)
}

/// Initializes logging into `{data_dir}/logs/poetry-admin.log`.
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
/// Calling this more than once keeps the first subscriber.
pub fn init_logging(data_dir: &Path, command: &str) -> Result<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .ok(); // already initialized

    let separator = format!(
        "\n{sep}\n[{ts}] New session: {command}\n{sep}\n",
        sep = "=".repeat(80),
        ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
    );

    use std::io::Write;
    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file(data_dir))
    {
        let _ = writeln!(file, "{}", separator);
    }

    tracing::info!(command, "Logging initialized");

    Ok(())
}

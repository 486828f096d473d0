use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::Context;
use jukebox_proto::config::LogConfig;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Wall-clock `HH:MM:SS`, the way the jukebox has always stamped its log.
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
    }
}

/// Install the global subscriber. Returns the log file path unless logging
/// goes to stderr.
pub fn init(config: &LogConfig, to_stderr: bool) -> anyhow::Result<Option<PathBuf>> {
    // RUST_LOG wins over the config file.
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("invalid log filter {:?}", config.filter))?,
    };

    let (writer, log_path) = if to_stderr {
        (BoxMakeWriter::new(std::io::stderr), None)
    } else {
        let log_path = config.log_path();
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("opening log file {}", log_path.display()))?;
        (BoxMakeWriter::new(log_file), Some(log_path))
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_timer(LocalTime)
        .with_target(false)
        .with_ansi(false)
        .init();

    Ok(log_path)
}

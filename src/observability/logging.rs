use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "csv_files_api.log";
pub const DEFAULT_DIRECTIVES: &str = "csv_files_api=debug,info";

/// `RUST_LOG` when set and valid, else [`DEFAULT_DIRECTIVES`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber: JSON lines to a daily file under
/// [`LOG_DIR`] and human-readable lines on stderr.
///
/// Stdout is left to command output, so `data` and `list` stay pipeable.
/// Hold the returned guard until exit; dropping it flushes the file writer.
pub fn init_logging() -> WorkerGuard {
    if let Err(e) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("cannot create {LOG_DIR}/: {e}");
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(LOG_DIR, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_writer(file_writer))
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_writer(std::io::stderr),
        )
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        let filter = EnvFilter::try_new(DEFAULT_DIRECTIVES).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("csv_files_api=debug"));
        assert!(rendered.contains("info"));
    }
}

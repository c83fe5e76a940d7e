use anima_core::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// With a log directory, output goes to a daily-rolling file and the returned
/// guard must be held until exit so buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "anima.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = fmt().with_env_filter(filter).with_ansi(false).with_writer(writer);
            if config.json {
                builder.json().init();
            } else {
                builder.init();
            }
            Some(guard)
        }
        None => {
            let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
            if config.json {
                builder.json().init();
            } else {
                builder.init();
            }
            None
        }
    }
}

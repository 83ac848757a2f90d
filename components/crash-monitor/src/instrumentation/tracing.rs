// External crates
use std::panic;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::{Directive, EnvFilter},
    fmt,
    prelude::*,
    registry::Registry,
};

/// Environment variable selecting where runtime logs are written.
pub const LOG_DIR_ENV: &str = "CRASH_MONITOR_LOG_DIR";

const DEFAULT_LOG_DIR: &str = "./crash_monitor/logs";
const DEFAULT_FILTER: &str = "info";

/// Resolve the runtime log directory from the environment.
pub fn log_dir_from_env() -> PathBuf {
    std::env::var_os(LOG_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
}

/// Install the global subscriber.
///
/// Records go to a daily rolling JSON file under `log_dir` so they never mix
/// with the tables printed on stdout. When the directory cannot be used the
/// subscriber degrades to warn-level records on stderr and `None` is returned.
pub fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("crash_monitor")
        .filename_suffix("log")
        .build(log_dir);

    match file_appender {
        Ok(appender) => {
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(appender);

            let mut filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

            // Dependency chatter stays out of the incident log unless asked for
            for noisy in ["hyper_util=warn", "reqwest=warn", "rustls=warn"] {
                if let Ok(directive) = noisy.parse::<Directive>() {
                    filter = filter.add_directive(directive);
                }
            }

            let json_layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(non_blocking_writer)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339());

            let subscriber = Registry::default()
                .with(filter)
                .with(json_layer)
                .with(ErrorLayer::default());

            if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
                eprintln!("warning: tracing subscriber already installed: {e}");
            }

            Some(guard)
        }
        Err(e) => {
            let stderr_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time();

            let subscriber = Registry::default()
                .with(EnvFilter::new("warn"))
                .with(stderr_layer)
                .with(ErrorLayer::default());

            if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
                eprintln!("warning: tracing subscriber already installed: {e}");
            }

            tracing::warn!(
                log_dir = %log_dir.display(),
                error = %e,
                "File logging unavailable, falling back to stderr"
            );

            None
        }
    }
}

/// Record panics as error events before the default unwinding output.
pub fn init_panic_handler() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let msg = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("Unknown panic");

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        error!(
            panic_message = %msg,
            location = %location,
            "Application panicked!"
        );

        default_hook(panic_info);
    }));
}

//! Crash Monitor: a local incident log backed by SQLite, with optional
//! Discord guild snapshots and webhook alerts.

mod cli;
mod discord;
mod helpers;
mod instrumentation;
mod render;
mod runtime;
mod store;

use anyhow::Result;

fn main() -> Result<()> {
    // The guard flushes the non-blocking file writer when `main` returns
    let _log_guard = instrumentation::tracing::init_tracing(
        &instrumentation::tracing::log_dir_from_env(),
    );
    instrumentation::tracing::init_panic_handler();

    // Main entrypoint simply delegates control to CLI layer.
    // The CLI parses user commands and then calls into the appropriate logic
    cli::cli::run()
}

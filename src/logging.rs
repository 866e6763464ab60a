//! Diagnostics for the logger itself.
//!
//! The consumer and sink report stream opens, sink failures and shutdown
//! summaries through `tracing`. Nothing here touches the producer path.
//! Applications that already install a subscriber do not need this module.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns false if a global
/// subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Installs a subscriber that writes diagnostics to `dir/<prefix>` through a
/// non-blocking appender.
///
/// Keep the returned guard alive for as long as diagnostics should be
/// flushed. Returns `None` if a global subscriber was already installed.
pub fn init_tracing_to_file(dir: impl AsRef<Path>, prefix: &str, default_filter: &str) -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::never(dir, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(writer)
        .try_init()
        .ok()
        .map(|_| guard)
}

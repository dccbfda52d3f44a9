//! provides logging helpers

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::{prelude::*, registry};

/// Installs a global subscriber printing to stdout, filtered by `RUST_LOG`
/// (default `info`).
///
/// Returns `false` if a global subscriber was already set.
pub fn init() -> bool {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let fmt_layer = layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_filter(env_filter);

    registry().with(fmt_layer).try_init().is_ok()
}

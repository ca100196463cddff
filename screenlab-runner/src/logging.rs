//! Logging setup — a `tracing-subscriber` fmt subscriber with an env filter.
//!
//! `RUST_LOG` overrides the configured default level. Log lines go to
//! stderr so stdout stays free for scan output.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_LEVEL: &str = "info";

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(default_level: &str) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(default_level, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_logging("debug");
        init_logging("warn");
        tracing::info!("still alive");
    }
}

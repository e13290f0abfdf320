// THEORY:
// The `telemetry` module installs the process-wide `tracing` subscriber. It
// runs once per process; every later call is a no-op.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOGGING: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber. Honours `RUST_LOG` and defaults
/// to `info`. Later calls are no-ops; nothing needs tearing down.
pub fn init_logging() {
    LOGGING.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init();
    });
}

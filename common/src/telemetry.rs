use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the process-wide tracing subscriber. Safe to call more than
/// once (e.g. from tests); later calls are no-ops.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

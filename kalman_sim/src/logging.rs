// kalman_sim/src/logging.rs

use tracing_subscriber::EnvFilter;

/// Used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,kalman_sim=debug,kalman_core=info";

/// Installs the global `tracing` subscriber.
///
/// Precedence: the explicit directive, then `RUST_LOG`, then [`DEFAULT_LOG_FILTER`].
/// An unparsable directive falls back to the default rather than aborting.
pub fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::try_new(d).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    // `try_init` so a second call (e.g. from tests) is a no-op.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

//! Structured tracing setup (§7 ambient stack).
//!
//! Logging happens at effect boundaries — parser I/O, thread pool lifecycle,
//! suggestion generation — not inside pure aggregation/scoring functions.
//! Verbosity is controlled by the `RUST_LOG` environment variable; default
//! level is `warn`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// # Panics
///
/// Panics if a subscriber has already been installed (e.g. called twice).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

/// Initializes tracing with an explicit filter string, e.g. `"bha=debug,warn"`.
/// Useful for tests or programmatic configuration where `RUST_LOG` isn't set.
pub fn init_tracing_with_filter(filter: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::new(filter))
        .init();
}

/// Whether debug-level logging is currently enabled, to let callers skip
/// expensive debug-only formatting.
pub fn is_debug_enabled() -> bool {
    tracing::enabled!(tracing::Level::DEBUG)
}

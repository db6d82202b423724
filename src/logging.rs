//! Logging setup for the bundled binaries.
//!
//! The library only emits `tracing` events (the queue logs dispatch,
//! completion, and discarded stale results); installing a subscriber is the
//! entry point's job.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter directives.
pub const LOG_ENV_VAR: &str = "FARSCRIBE_LOG";

/// Install a JSON-formatted `tracing` subscriber.
///
/// Filtering comes from [`LOG_ENV_VAR`] (standard directives, e.g.
/// `farscribe=debug`); without it only errors are emitted. Span context is
/// included so queue events carry their job ids. Safe to call more than once;
/// later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(tracing::level_filters::LevelFilter::ERROR.into())
        .from_env_lossy();

    let json = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .try_init();
}

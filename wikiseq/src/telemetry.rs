//! Tracing initialization (env-filter + fmt subscriber).
//!
//! Log verbosity is controlled with the standard `RUST_LOG` environment
//! variable and defaults to `info`. Diagram bodies are never logged from
//! here; that is gated separately by the `log_diagram_bodies` config flag
//! at the call sites that see them.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; a second call fails and the error is
/// propagated to the caller.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("Telemetry initialized");

    Ok(())
}

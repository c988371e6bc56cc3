//! Logging setup.
//! The library itself only emits `tracing` events; embedding applications and benches call
//! [`init`] once to get them printed.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "orbital_ring=info";

/// Installs a fmt subscriber filtered by `RUST_LOG`.
/// Safe to call more than once, later calls are ignored.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_init_is_idempotent() {
        super::init();
        super::init();
        tracing::info!("telemetry initialised twice without panicking");
    }
}

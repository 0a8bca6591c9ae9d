//! Tracing setup for tests and benches.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::warn!("visible with RUST_LOG unset");
    }
}

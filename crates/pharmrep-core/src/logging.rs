//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::config;

static INIT: Once = Once::new();

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init() {
    INIT.call_once(|| {
        let result = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
            )
            .try_init();

        match result {
            Ok(()) => tracing::info!("{} core v{}", config::APP_NAME, config::APP_VERSION),
            // Host already installed a subscriber
            Err(e) => tracing::debug!(error = %e, "Tracing subscriber not installed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        assert!(INIT.is_completed());
    }
}

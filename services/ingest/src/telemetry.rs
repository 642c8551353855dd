//! services/ingest/src/telemetry.rs
//!
//! Logging setup for processes embedding the ingestion service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Installs the global `tracing` subscriber at the configured level.
///
/// Returns `false` if a subscriber was already installed, e.g. by the host
/// application or by an earlier call in the same test binary.
pub fn init_tracing(config: &Config) -> bool {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_refused_without_panicking() {
        let config = Config::from_lookup(|key| match key {
            "INGEST_BACKEND_URL" => Some("http://localhost".to_string()),
            "RUST_LOG" => Some("debug".to_string()),
            _ => None,
        })
        .unwrap();

        init_tracing(&config);
        assert!(!init_tracing(&config));
        tracing::debug!("still logging after a refused install");
    }
}

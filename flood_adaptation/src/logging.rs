//! tracing subscriber setup for the binaries

use crate::{Result, SimulationError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install a stderr subscriber; `RUST_LOG` wins over `filter` when set
pub fn init_tracing(filter: &str) -> Result<()> {
    let env_filter = build_env_filter(&effective_filter(filter))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .try_init()
        .map_err(|e| {
            SimulationError::Configuration(format!(
                "failed to initialize tracing subscriber: {}",
                e
            ))
        })?;

    tracing::debug!(target: "logging", filter = %filter, "tracing initialized");
    Ok(())
}

fn effective_filter(configured: &str) -> String {
    match std::env::var("RUST_LOG") {
        Ok(env) if !env.trim().is_empty() => env,
        _ => configured.to_string(),
    }
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    if filter.trim().is_empty() {
        return Err(SimulationError::Configuration(
            "logging.filter cannot be empty".to_string(),
        ));
    }
    EnvFilter::try_new(filter).map_err(|e| {
        SimulationError::Configuration(format!("failed to parse logging.filter '{}': {}", filter, e))
    })
}

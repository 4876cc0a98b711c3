//! Prometheus metrics for the dispatch lifecycle.
//!
//! Metrics are recorded through the `metrics` facade, so they cost nothing
//! until a recorder is installed:
//! - `lifecycle_actions_total{phase}`: intents, requested, succeeded and failed actions
//! - `lifecycle_resolution_miss_total`: intents with no matching service method
//! - `lifecycle_passthrough_total`: actions forwarded untouched
//! - `lifecycle_creators_synthesized_total`: action creators built on first access
//! - `lifecycle_settle_duration_seconds`: time from request to settlement
//!
//! # Example
//!
//! ```rust,no_run
//! use composable_lifecycle_runtime::metrics::install_prometheus_recorder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! if let Some(handle) = install_prometheus_recorder()? {
//!     println!("{}", handle.render());
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Lifecycle actions by phase
pub const ACTIONS_TOTAL: &str = "lifecycle_actions_total";
/// Intents that resolved to nothing
pub const RESOLUTION_MISS_TOTAL: &str = "lifecycle_resolution_miss_total";
/// Actions forwarded without a lifecycle
pub const PASSTHROUGH_TOTAL: &str = "lifecycle_passthrough_total";
/// Action creators synthesized
pub const CREATORS_SYNTHESIZED_TOTAL: &str = "lifecycle_creators_synthesized_total";
/// Settlement latency
pub const SETTLE_DURATION_SECONDS: &str = "lifecycle_settle_duration_seconds";

const SETTLE_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(ACTIONS_TOTAL, "Lifecycle actions dispatched, by phase");
    describe_counter!(
        RESOLUTION_MISS_TOTAL,
        "Intent actions with no matching service or method"
    );
    describe_counter!(
        PASSTHROUGH_TOTAL,
        "Actions forwarded without starting a lifecycle"
    );
    describe_counter!(
        CREATORS_SYNTHESIZED_TOTAL,
        "Action creators synthesized on first access"
    );
    describe_histogram!(
        SETTLE_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time from the requested action to settlement"
    );
}

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Returns the handle used to render the exposition text, or `None` if a
/// recorder was already installed (common in tests).
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the exporter cannot be configured.
pub fn install_prometheus_recorder() -> Result<Option<PrometheusHandle>, MetricsError> {
    register_metrics();

    let recorder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(SETTLE_DURATION_SECONDS.to_string()),
            SETTLE_BUCKETS,
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
        return Ok(None);
    }

    tracing::info!("Prometheus metrics recorder installed");
    Ok(Some(handle))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_tolerant() {
        let first = install_prometheus_recorder().unwrap();
        let second = install_prometheus_recorder().unwrap();

        // Only one recorder can ever be installed per process
        assert!(first.is_none() || second.is_none());
        assert!(second.is_none());
    }

    #[test]
    fn test_register_metrics_without_recorder() {
        register_metrics();
    }
}

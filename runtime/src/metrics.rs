//! Prometheus metrics for observability and monitoring.
//!
//! Metric collection for the runtime:
//! - Store dispatch and effect execution
//! - Endpoint fetch lifecycle (started, succeeded, failed, skipped, duration)
//!
//! # Example
//!
//! ```rust,no_run
//! use endpoint_store_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder for the process.
///
/// Installs the global recorder and renders the scrape text. Nothing is served
/// over HTTP; applications expose [`render`](Self::render) however they like.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that is not installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// A recorder that is already installed (e.g., by another test) is not an
    /// error; the handle then stays `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this instance.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    // Store Metrics
    describe_counter!("store.commands.total", "Total number of actions reduced by stores");
    describe_counter!(
        "store.effects.executed",
        "Total number of effects executed, by effect type"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to run the reducer for one action"
    );
    describe_counter!("store.shutdown.initiated", "Number of graceful shutdowns started");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // Endpoint Metrics
    describe_counter!("endpoint.fetch.started", "Fetches issued, by endpoint");
    describe_counter!("endpoint.fetch.succeeded", "Fetches that produced data, by endpoint");
    describe_counter!(
        "endpoint.fetch.failed",
        "Fetches that ended in an error record, by endpoint"
    );
    describe_counter!(
        "endpoint.fetch.skipped",
        "Evaluations that issued no request, by endpoint and reason"
    );
    describe_histogram!(
        "endpoint.fetch.duration_seconds",
        "Time from issuing a fetch to its terminal record"
    );
}

/// Endpoint fetch metrics recorder.
pub struct FetchMetrics;

impl FetchMetrics {
    /// Record an issued fetch.
    pub fn record_started(endpoint: &str) {
        counter!("endpoint.fetch.started", "endpoint" => endpoint.to_string()).increment(1);
    }

    /// Record a terminal record and how long it took.
    pub fn record_finished(endpoint: &str, succeeded: bool, duration: Duration) {
        histogram!("endpoint.fetch.duration_seconds", "endpoint" => endpoint.to_string())
            .record(duration.as_secs_f64());
        if succeeded {
            counter!("endpoint.fetch.succeeded", "endpoint" => endpoint.to_string()).increment(1);
        } else {
            counter!("endpoint.fetch.failed", "endpoint" => endpoint.to_string()).increment(1);
        }
    }

    /// Record an evaluation that issued no request.
    pub fn record_skipped(endpoint: &str, reason: &'static str) {
        counter!(
            "endpoint.fetch.skipped",
            "endpoint" => endpoint.to_string(),
            "reason" => reason
        )
        .increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic
mod tests {
    use super::*;

    #[test]
    fn test_recorder_creation() {
        let recorder = MetricsRecorder::new();
        assert!(recorder.handle().is_none());
        assert!(recorder.render().is_none());
    }

    #[test]
    fn test_recorder_install_renders_fetch_metrics() {
        let mut recorder = MetricsRecorder::new();
        assert!(recorder.install().is_ok());

        // A second install is tolerated
        let mut other = MetricsRecorder::new();
        assert!(other.install().is_ok());
        assert!(other.handle().is_none());

        FetchMetrics::record_started("disclaimer");
        let text = recorder.render().unwrap();
        assert!(text.contains("endpoint_fetch_started"));
    }

    #[test]
    fn test_fetch_metrics_record_calls() {
        FetchMetrics::record_started("events");
        FetchMetrics::record_finished("events", true, Duration::from_millis(5));
        FetchMetrics::record_skipped("events", "already_requested");
    }
}

//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction/error counters, slow
//!   ONNX inferences, model state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors: IntCounterVec,
    slow_inferences: IntCounter,
    model_loaded: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "price_api_prediction_latency_seconds",
                "Time spent canonicalizing and running the model for one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "price_api_predictions_total",
                "Total number of successful predictions"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "price_api_prediction_errors_total",
                "Total number of failed prediction requests by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors"),

            slow_inferences: register_int_counter!(
                "price_api_slow_inferences_total",
                "Total number of ONNX inferences slower than the latency target"
            )
            .expect("Failed to register slow_inferences"),

            model_loaded: register_int_gauge!(
                "price_api_model_loaded",
                "1 if the model bundle loaded at startup, 0 otherwise"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance. Clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner().prediction_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_slow_inferences(&self) {
        self.inner().slow_inferences.inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_path: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_path = %model_path,
            "Prediction service starting"
        );
    }

    pub fn log_model_loaded(&self, model_path: &str, kind: &str, feature_order: &[String]) {
        info!(
            event = "model_loaded",
            service = %self.service,
            model_path = %model_path,
            kind = %kind,
            feature_order = ?feature_order,
            "Model bundle ready"
        );
    }

    pub fn log_model_load_failed(&self, model_path: &str, error_kind: &str, error: &str) {
        warn!(
            event = "model_load_failed",
            service = %self.service,
            model_path = %model_path,
            error_kind = %error_kind,
            error = %error,
            "Model bundle failed to load, serving in degraded mode"
        );
    }

    pub fn log_prediction_failed(&self, error_kind: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            error_kind = %error_kind,
            error = %error,
            "Prediction request failed"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        // Metrics live in the global Prometheus registry; repeated handles share it.
        let metrics = ServiceMetrics::new();
        let again = ServiceMetrics::new();

        metrics.observe_prediction_latency(0.0002);
        metrics.inc_predictions();
        metrics.inc_prediction_errors("BadRequest");
        metrics.inc_slow_inferences();
        again.set_model_loaded(true);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "price_api_predictions_total"));
        assert!(families
            .iter()
            .any(|f| f.get_name() == "price_api_slow_inferences_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("price-api");
        assert_eq!(logger.service, "price-api");
    }
}

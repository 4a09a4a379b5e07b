use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // State store Metrics
    pub static ref STATE_STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "state_store_operations_total",
        "Total number of answer state store operations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref STATE_STORE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "state_store_operation_duration_seconds",
        "Answer state store operation duration in seconds",
        &["operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1]
    )
    .unwrap();

    // Business Metrics
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answer_sessions_total",
        "Total number of answer sessions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "answer_sessions_active",
        "Number of currently open answer sessions"
    )
    .unwrap();

    pub static ref STATEMENTS_DISPATCHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "statements_dispatched_total",
        "Total number of activity statements dispatched",
        &["verb"]
    )
    .unwrap();

    pub static ref AUTOSAVE_TIMERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "autosave_timers_total",
        "Autosave debounce timers by outcome",
        &["outcome"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track state store operation with metrics
pub async fn track_store_operation<F, T>(operation: &str, future: F) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    STATE_STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    STATE_STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = STATEMENTS_DISPATCHED_TOTAL
            .with_label_values(&["responded"])
            .get();
    }

    #[test]
    fn test_render_metrics() {
        AUTOSAVE_TIMERS_TOTAL.with_label_values(&["armed"]).inc();

        let result = render_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("autosave_timers_total"));
    }

    #[tokio::test]
    async fn test_track_store_operation_counts_errors() {
        let before = STATE_STORE_OPERATIONS_TOTAL
            .with_label_values(&["lookup", "error"])
            .get();
        let result: Result<(), _> =
            track_store_operation("lookup", async { Err(anyhow::anyhow!("offline")) }).await;
        assert!(result.is_err());
        assert_eq!(
            STATE_STORE_OPERATIONS_TOTAL
                .with_label_values(&["lookup", "error"])
                .get(),
            before + 1
        );
    }
}

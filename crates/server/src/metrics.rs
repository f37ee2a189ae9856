use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "record_api_requests_total",
        "Record API requests by operation",
        &["operation"]
    )
    .expect("register requests_total")
});

pub static STORAGE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "record_api_storage_errors_total",
        "Storage operations that failed inside the backend"
    )
    .expect("register storage_errors_total")
});

pub static RELOADS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "record_api_reloads_total",
        "Demo data reloads triggered by this process"
    )
    .expect("register reloads_total")
});

pub fn observe(operation: &str) {
    REQUESTS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_operations_show_up_in_output() {
        observe("get");
        let (status, text) = encode_metrics();
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("record_api_requests_total"));
        assert!(text.contains("operation=\"get\""));
    }
}

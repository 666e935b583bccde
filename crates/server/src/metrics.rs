use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};
use service::vision::ExtractionOutcome;

// Prometheus metrics (default registry)
pub static UPLOADS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "meter_reader_uploads_total",
        "Total readings created by uploads"
    )
    .expect("register uploads_total")
});

pub static EXTRACTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "meter_reader_extractions_total",
        "Automated meter readings by outcome",
        &["outcome"]
    )
    .expect("register extractions_total")
});

pub static CONFIRMS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "meter_reader_confirms_total",
        "Total readings confirmed by customers"
    )
    .expect("register confirms_total")
});

pub static LINK_REJECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "meter_reader_link_rejections_total",
        "Image requests rejected for a missing, forged or expired token"
    )
    .expect("register link_rejections_total")
});

/// Register every metric so `/metrics` lists them before their first event.
pub fn init() {
    Lazy::force(&UPLOADS_TOTAL);
    for outcome in ExtractionOutcome::ALL {
        EXTRACTIONS_TOTAL.with_label_values(&[outcome.as_label()]);
    }
    Lazy::force(&CONFIRMS_TOTAL);
    Lazy::force(&LINK_REJECTIONS_TOTAL);
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder};

static MESSAGES_PERSISTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "messaging_service_messages_persisted_total",
        "Messages accepted and stored",
    )
    .expect("failed to create messaging_service_messages_persisted_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register messaging_service_messages_persisted_total");
    counter
});

static EVENTS_DELIVERED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "messaging_service_events_delivered_total",
            "Live event frames handed to connections, by event",
        ),
        &["event"],
    )
    .expect("failed to create messaging_service_events_delivered_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register messaging_service_events_delivered_total");
    counter
});

static GATEWAY_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "messaging_service_gateway_errors_total",
            "Error events sent to live connections, by code",
        ),
        &["code"],
    )
    .expect("failed to create messaging_service_gateway_errors_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register messaging_service_gateway_errors_total");
    counter
});

static ACTIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "messaging_service_active_connections",
        "Authenticated live connections",
    )
    .expect("failed to create messaging_service_active_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register messaging_service_active_connections");
    gauge
});

pub fn record_message_persisted() {
    MESSAGES_PERSISTED_TOTAL.inc();
}

pub fn record_broadcast(event: &str, delivered: usize) {
    EVENTS_DELIVERED_TOTAL
        .with_label_values(&[event])
        .inc_by(delivered as u64);
}

pub fn record_gateway_error(code: &str) {
    GATEWAY_ERRORS_TOTAL.with_label_values(&[code]).inc();
}

pub fn connection_opened() {
    ACTIVE_CONNECTIONS.inc();
}

pub fn connection_closed() {
    ACTIVE_CONNECTIONS.dec();
}

pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

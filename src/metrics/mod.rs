//! Prometheus metrics for the HTTP surface, zone reservations and workflow transitions.
//!
//! Collectors live in a private registry and are exposed in text format at `/metrics`.

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use prometheus::{
    Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref HTTP_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("http_requests_total", "HTTP requests by method and status"),
        &["method", "status"]
    )
    .expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds"
        ),
        &["method"]
    )
    .expect("metric can be created");
    pub static ref ENERGY_RESERVATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "energy_reservations_total",
            "Reserve and release attempts by operation and outcome"
        ),
        &["operation", "outcome"]
    )
    .expect("metric can be created");
    pub static ref ENERGY_KWH_MOVED: CounterVec = CounterVec::new(
        Opts::new(
            "energy_kwh_moved_total",
            "kWh/day reserved or released across all zones"
        ),
        &["operation"]
    )
    .expect("metric can be created");
    pub static ref WORKFLOW_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "workflow_transitions_total",
            "Workflow transitions by resource, action and outcome"
        ),
        &["resource", "action", "outcome"]
    )
    .expect("metric can be created");
    pub static ref OPTIMISTIC_LOCK_CONFLICTS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "optimistic_lock_conflicts_total",
            "Version-guarded writes that lost a race or found the database locked"
        ),
        &["resource"]
    )
    .expect("metric can be created");
    pub static ref EVENTS_DROPPED: Counter = Counter::new(
        "domain_events_dropped_total",
        "Domain events that could not be queued"
    )
    .expect("metric can be created");
}

static REGISTERED: OnceCell<()> = OnceCell::new();

/// Registers every collector with `REGISTRY`. Safe to call more than once.
pub fn register_metrics() -> Result<(), MetricsError> {
    REGISTERED
        .get_or_try_init(|| {
            REGISTRY.register(Box::new(HTTP_REQUESTS.clone()))?;
            REGISTRY.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
            REGISTRY.register(Box::new(ENERGY_RESERVATIONS.clone()))?;
            REGISTRY.register(Box::new(ENERGY_KWH_MOVED.clone()))?;
            REGISTRY.register(Box::new(WORKFLOW_TRANSITIONS.clone()))?;
            REGISTRY.register(Box::new(OPTIMISTIC_LOCK_CONFLICTS.clone()))?;
            REGISTRY.register(Box::new(EVENTS_DROPPED.clone()))?;
            Ok::<(), MetricsError>(())
        })
        .map(|_| ())
}

/// Renders the registry in Prometheus text exposition format.
pub fn gather_metrics() -> Result<String, MetricsError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| MetricsError::ExportError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError::ExportError(e.to_string()))
}

pub fn record_reservation(operation: &str, outcome: &str) {
    ENERGY_RESERVATIONS
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_kwh_moved(operation: &str, kwh: f64) {
    if kwh.is_finite() && kwh > 0.0 {
        ENERGY_KWH_MOVED.with_label_values(&[operation]).inc_by(kwh);
    }
}

pub fn record_transition(resource: &str, action: &str, outcome: &str) {
    WORKFLOW_TRANSITIONS
        .with_label_values(&[resource, action, outcome])
        .inc();
}

pub fn record_lock_conflict(resource: &str) {
    OPTIMISTIC_LOCK_CONFLICTS
        .with_label_values(&[resource])
        .inc();
}

use actix_web::HttpResponse;
use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, TextEncoder};
use tracing::warn;

const SERVICE: &str = "matching_service";

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::with_opts(Opts::new(name, help).const_label("service", SERVICE))
        .expect("valid metric opts for counter")
}

fn register(metrics: Vec<Box<dyn Collector>>) {
    let registry = prometheus::default_registry();
    for metric in metrics {
        if let Err(e) = registry.register(metric) {
            warn!("Failed to register matching metric: {}", e);
        }
    }
}

/// Geocoding reconciliation counters
#[derive(Clone)]
pub struct ReconcileMetrics {
    pub runs: IntCounter,
    pub updated: IntCounter,
    pub failed: IntCounter,
}

impl ReconcileMetrics {
    pub fn new() -> Self {
        let runs = counter("geocode_runs_total", "Completed worker geocoding runs");
        let updated = counter(
            "geocode_workers_updated_total",
            "Workers whose base coordinates were resolved",
        );
        let failed = counter(
            "geocode_workers_failed_total",
            "Workers that could not be geocoded or saved",
        );

        register(vec![
            Box::new(runs.clone()),
            Box::new(updated.clone()),
            Box::new(failed.clone()),
        ]);

        Self {
            runs,
            updated,
            failed,
        }
    }
}

impl Default for ReconcileMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Match dispatch queue metrics, refreshed every processor cycle
#[derive(Clone)]
pub struct DispatchMetrics {
    pub succeeded: IntCounter,
    pub failed: IntCounter,
    pub pending: IntGauge,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        let succeeded = counter(
            "match_dispatch_succeeded_total",
            "Dispatch tasks whose job was scored",
        );
        let failed = counter(
            "match_dispatch_failed_total",
            "Failed dispatch attempts",
        );
        let pending = IntGauge::with_opts(
            Opts::new(
                "match_dispatch_pending",
                "Undispatched tasks still eligible for delivery",
            )
            .const_label("service", SERVICE),
        )
        .expect("valid metric opts for match_dispatch_pending");

        register(vec![
            Box::new(succeeded.clone()),
            Box::new(failed.clone()),
            Box::new(pending.clone()),
        ]);

        Self {
            succeeded,
            failed,
            pending,
        }
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

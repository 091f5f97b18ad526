/// Worker geolocation backfill
///
/// Scans workers whose base coordinates are missing, resolves their postcode
/// through the geocoder and writes the coordinates back. Workers are handled
/// strictly one at a time behind a `Pacer` so the upstream ceiling holds.
/// A failure on one worker is recorded and never stops the batch.
use resilience::{Pacer, SingleFlight};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::geocoding::{GeocodeError, Geocoder};
use crate::db::{StoreError, WorkerStore};
use crate::metrics::ReconcileMetrics;
use crate::models::Worker;

/// Failure messages beyond this many are counted but not listed.
pub const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub updated: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("A geocoding run is already in progress")]
    AlreadyRunning,

    #[error("Failed to fetch workers: {0}")]
    Fetch(#[source] StoreError),
}

/// Why a single worker could not be reconciled
#[derive(Debug, thiserror::Error)]
enum WorkerFailure {
    #[error("No postcode available")]
    NoPostcode,

    #[error("Could not geocode postcode {0}")]
    NoResult(String),

    #[error("{0}")]
    Upstream(#[from] GeocodeError),

    #[error("{0}")]
    Persistence(#[from] StoreError),
}

/// Counts every failure, keeps the first `cap` messages.
#[derive(Debug)]
struct FailureLog {
    failed: u32,
    messages: Vec<String>,
    cap: usize,
}

impl FailureLog {
    fn new(cap: usize) -> Self {
        Self {
            failed: 0,
            messages: Vec::new(),
            cap,
        }
    }

    fn record(&mut self, worker: &Worker, failure: &WorkerFailure) {
        self.failed += 1;
        let message = format!("Worker {}: {}", worker.id, failure);
        warn!(worker_id = %worker.id, error = %failure, "Worker geocoding failed");
        if self.messages.len() < self.cap {
            self.messages.push(message);
        }
    }
}

pub struct GeocodeReconciler {
    workers: Arc<dyn WorkerStore>,
    geocoder: Arc<dyn Geocoder>,
    pacer: Pacer,
    flight: SingleFlight,
    metrics: Option<ReconcileMetrics>,
}

impl GeocodeReconciler {
    pub fn new(workers: Arc<dyn WorkerStore>, geocoder: Arc<dyn Geocoder>, pacer: Pacer) -> Self {
        Self {
            workers,
            geocoder,
            pacer,
            flight: SingleFlight::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ReconcileMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_running(&self) -> bool {
        self.flight.is_running()
    }

    /// Backfill coordinates for every worker missing them.
    ///
    /// Callers must have checked admin rights already (see
    /// `middleware::auth::require_admin`). Overlapping runs are rejected with
    /// `ReconcileError::AlreadyRunning`.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, ReconcileError> {
        let _permit = self
            .flight
            .try_acquire()
            .ok_or(ReconcileError::AlreadyRunning)?;

        let candidates = self
            .workers
            .find_missing_coordinates()
            .await
            .map_err(ReconcileError::Fetch)?;

        if candidates.is_empty() {
            if let Some(metrics) = &self.metrics {
                metrics.runs.inc();
            }
            info!("No workers missing coordinates");
            return Ok(ReconcileSummary::default());
        }

        let started = Instant::now();
        info!(
            candidates = candidates.len(),
            interval_ms = self.pacer.interval().as_millis() as u64,
            "Starting worker geocoding run"
        );

        let mut updated = 0u32;
        let mut failures = FailureLog::new(MAX_REPORTED_ERRORS);

        for worker in &candidates {
            self.pacer.ready().await;

            match self.reconcile_worker(worker).await {
                Ok(()) => updated += 1,
                Err(failure) => failures.record(worker, &failure),
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.runs.inc();
            metrics.updated.inc_by(u64::from(updated));
            metrics.failed.inc_by(u64::from(failures.failed));
        }

        info!(
            updated,
            failed = failures.failed,
            duration_ms = started.elapsed().as_millis() as u64,
            "Worker geocoding run finished"
        );

        Ok(ReconcileSummary {
            updated,
            failed: failures.failed,
            errors: failures.messages,
        })
    }

    async fn reconcile_worker(&self, worker: &Worker) -> Result<(), WorkerFailure> {
        let postcode = worker.effective_postcode().ok_or(WorkerFailure::NoPostcode)?;

        let coordinates = self
            .geocoder
            .lookup(postcode)
            .await?
            .ok_or_else(|| WorkerFailure::NoResult(postcode.to_string()))?;

        self.workers
            .save_location(worker.id, postcode, coordinates)
            .await?;

        Ok(())
    }
}

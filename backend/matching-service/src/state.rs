use std::sync::Arc;

use crate::services::{GeocodeReconciler, JobService, MatchDispatcher, MatchReader};

/// Services shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<GeocodeReconciler>,
    pub jobs: Arc<JobService>,
    pub matches: Arc<MatchReader>,
    pub dispatcher: Arc<MatchDispatcher>,
}

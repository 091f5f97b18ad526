/// Business logic for matching-service
///
/// - `geocoding`: postcode lookups against the external geocoder
/// - `reconciler`: paced backfill of missing worker coordinates
/// - `scorer`: contract with the external match scorer
/// - `dispatcher`: durable, at-least-once match dispatch
/// - `matches`: ranked match retrieval
/// - `jobs`: job creation and listing
pub mod dispatcher;
pub mod geocoding;
pub mod jobs;
pub mod matches;
pub mod reconciler;
pub mod scorer;

pub use dispatcher::{DispatchConfig, DispatchProcessor, MatchDispatcher};
pub use geocoding::{Geocoder, PostcodesIoGeocoder};
pub use jobs::JobService;
pub use matches::MatchReader;
pub use reconciler::{GeocodeReconciler, ReconcileError, ReconcileSummary};
pub use scorer::{HttpMatchScorer, MatchScorer, ScorerError};

/// Resilience primitives shared by backend services
///
/// - **Pacer**: token-bucket pacing that keeps sequential callers under an
///   upstream's published request ceiling
/// - **SingleFlight**: rejects overlapping runs of the same operation instead
///   of queueing them
///
/// # Example: Pacing calls to an external API
///
/// ```rust,no_run
/// use resilience::Pacer;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let pacer = Pacer::with_interval(Duration::from_millis(150)).unwrap();
///
///     for postcode in ["SW1A 1AA", "EC1A 1BB"] {
///         pacer.ready().await;
///         // call the upstream with `postcode`
///         let _ = postcode;
///     }
/// }
/// ```

pub mod pacer;
pub mod single_flight;

pub use pacer::{Pacer, PacerError};
pub use single_flight::{FlightPermit, SingleFlight};

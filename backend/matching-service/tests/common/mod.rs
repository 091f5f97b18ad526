//! Shared fixtures for matching-service integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use matching_service::db::InMemoryStore;
use matching_service::middleware::{Claims, Role};
use matching_service::models::{Coordinates, Worker};
use matching_service::services::geocoding::{GeocodeError, Geocoder};
use matching_service::services::{
    DispatchConfig, GeocodeReconciler, JobService, MatchDispatcher, MatchReader, MatchScorer,
    ScorerError,
};
use matching_service::AppState;
use resilience::Pacer;

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn bearer(user_id: Uuid, role: Role) -> (&'static str, String) {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        role,
        exp: now + 600,
        iat: now,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode test token");

    ("Authorization", format!("Bearer {}", token))
}

/// Geocoder answering from a fixed table; unknown postcodes have no result.
#[derive(Default)]
pub struct StubGeocoder {
    known: HashMap<String, Coordinates>,
    pub calls: AtomicUsize,
}

impl StubGeocoder {
    pub fn with(mut self, postcode: &str, latitude: f64, longitude: f64) -> Self {
        self.known.insert(
            postcode.to_string(),
            Coordinates {
                latitude,
                longitude,
            },
        );
        self
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn lookup(&self, postcode: &str) -> Result<Option<Coordinates>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.known.get(postcode).copied())
    }
}

/// Scorer whose every invocation fails.
#[derive(Default)]
pub struct FailingScorer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl MatchScorer for FailingScorer {
    async fn score_job(&self, _job_id: Uuid) -> Result<usize, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ScorerError::Upstream {
            status: 500,
            body: "scoring model crashed".into(),
        })
    }
}

pub fn worker(id: u128, postcode: Option<&str>, base_postcode: Option<&str>) -> Worker {
    Worker {
        id: Uuid::from_u128(id),
        postcode: postcode.map(String::from),
        base_postcode: base_postcode.map(String::from),
        base_latitude: None,
        base_longitude: None,
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub dispatcher: Arc<MatchDispatcher>,
    pub state: AppState,
}

pub fn harness(geocoder: Arc<dyn Geocoder>) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let pacer = Pacer::with_interval(Duration::from_millis(1)).expect("valid pacer interval");
    let dispatcher = Arc::new(MatchDispatcher::new(
        store.clone(),
        DispatchConfig::default(),
    ));

    let state = AppState {
        reconciler: Arc::new(GeocodeReconciler::new(store.clone(), geocoder, pacer)),
        jobs: Arc::new(JobService::new(store.clone(), dispatcher.clone())),
        matches: Arc::new(MatchReader::new(store.clone())),
        dispatcher: dispatcher.clone(),
    };

    Harness {
        store,
        dispatcher,
        state,
    }
}

/// Build an initialised test service for a harness.
#[macro_export]
macro_rules! test_app {
    ($harness:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($harness.state.clone()))
                .app_data(actix_web::web::Data::new(
                    matching_service::middleware::JwtValidator::new(common::JWT_SECRET),
                ))
                .configure(matching_service::handlers::configure),
        )
        .await
    };
}

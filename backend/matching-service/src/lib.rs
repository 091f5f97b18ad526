//! matching-service
//!
//! Matches property-maintenance jobs to workers. Owns worker geocoding
//! backfill, durable match dispatch on job creation, and ranked match reads.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use error::{AppError, Result};
pub use state::AppState;

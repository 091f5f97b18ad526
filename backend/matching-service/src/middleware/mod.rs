/// Request authentication for matching-service
pub mod auth;

pub use auth::{require_admin, AdminGrant, AuthenticatedUser, Claims, JwtValidator, Role};

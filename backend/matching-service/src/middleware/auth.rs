//! Bearer-token authentication and the admin guard
//!
//! `AuthenticatedUser` is an extractor, so a handler that takes it can only
//! run for a valid token. Admin-only work additionally requires an
//! `AdminGrant`, which only `require_admin` can produce.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
    Worker,
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid, // Subject (user ID)
    pub role: Role,
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued at
}

/// HS256 token verification with a shared secret
#[derive(Clone)]
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

/// Caller identity taken from a verified bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    fn from_http(req: &HttpRequest) -> Result<Self, AppError> {
        let validator = req
            .app_data::<web::Data<JwtValidator>>()
            .ok_or_else(|| AppError::Internal("JWT validator not configured".into()))?;

        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Malformed Authorization header".into()))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".into()))?;

        let claims = validator.validate(token)?;

        Ok(Self {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_http(req))
    }
}

/// Proof that the caller was checked for the admin role
#[derive(Debug)]
pub struct AdminGrant {
    admin_id: Uuid,
}

impl AdminGrant {
    pub fn admin_id(&self) -> Uuid {
        self.admin_id
    }
}

/// Admin guard composed in front of reconciliation and queue operations.
pub fn require_admin(user: &AuthenticatedUser) -> Result<AdminGrant, AppError> {
    if user.role != Role::Admin {
        return Err(AppError::Forbidden("Admin role required".into()));
    }
    Ok(AdminGrant {
        admin_id: user.user_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn token(role: Role, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::from_u128(7),
            role,
            exp: (now + ttl_secs) as usize,
            iat: now as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn request(auth: Option<String>) -> HttpRequest {
        let mut req = TestRequest::default().app_data(web::Data::new(JwtValidator::new(SECRET)));
        if let Some(value) = auth {
            req = req.insert_header((header::AUTHORIZATION, value));
        }
        req.to_http_request()
    }

    #[test]
    fn test_valid_token_yields_user() {
        let req = request(Some(format!("Bearer {}", token(Role::Client, 300))));

        let user = AuthenticatedUser::from_http(&req).unwrap();
        assert_eq!(user.user_id, Uuid::from_u128(7));
        assert_eq!(user.role, Role::Client);
    }

    #[test]
    fn test_missing_and_malformed_headers_are_unauthorized() {
        for auth in [None, Some("Basic abc".to_string()), Some("Bearer ".to_string())] {
            let err = AuthenticatedUser::from_http(&request(auth)).unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }
    }

    #[test]
    fn test_expired_or_foreign_token_is_unauthorized() {
        let expired = token(Role::Admin, -3600);
        let err = JwtValidator::new(SECRET).validate(&expired).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let fresh = token(Role::Admin, 300);
        let err = JwtValidator::new("another-secret")
            .validate(&fresh)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_require_admin() {
        let admin = AuthenticatedUser {
            user_id: Uuid::from_u128(1),
            role: Role::Admin,
        };
        assert_eq!(require_admin(&admin).unwrap().admin_id(), admin.user_id);

        for role in [Role::Client, Role::Worker] {
            let user = AuthenticatedUser {
                user_id: Uuid::from_u128(2),
                role,
            };
            assert!(matches!(require_admin(&user), Err(AppError::Forbidden(_))));
        }
    }
}

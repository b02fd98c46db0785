pub mod policy;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::error::ApiError;

/// Bearer token claims. `sub` is the user id; the user row itself is
/// re-resolved on every request, so a stale `role_id` here never grants
/// anything.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role_id: i64,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i64, role_id: i64, expiry_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role_id,
            iat: now.timestamp(),
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
        }
    }
}

pub fn issue_token(claims: &Claims, security: &SecurityConfig) -> Result<String, ApiError> {
    let key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &key).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::Internal
    })
}

/// Stateless verification; an invalid or expired token is Unauthorized.
pub fn verify_token(token: &str, security: &SecurityConfig) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    decode::<Claims>(token, &key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized)
}

/// One-way salted hash, fixed work factor from configuration.
pub fn hash_password(password: &str, security: &SecurityConfig) -> Result<String, ApiError> {
    bcrypt::hash(password, security.bcrypt_cost).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::Internal
    })
}

/// Comparison through the hashing library's own verifier.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(password, hash).map_err(|e| {
        tracing::error!("password verification failed: {}", e);
        ApiError::Internal
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn hash_then_verify_round_trips() {
        let config = AppConfig::for_tests();
        let hash = hash_password("Correct1Horse", &config.security).unwrap();
        assert!(verify_password("Correct1Horse", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn token_round_trips_subject() {
        let config = AppConfig::for_tests();
        let claims = Claims::new(42, 2, config.security.jwt_expiry_hours);
        let token = issue_token(&claims, &config.security).unwrap();
        let decoded = verify_token(&token, &config.security).unwrap();
        assert_eq!(decoded.sub, 42);
        assert_eq!(decoded.role_id, 2);
    }

    #[test]
    fn tampered_token_is_unauthorized() {
        let config = AppConfig::for_tests();
        let claims = Claims::new(1, 1, config.security.jwt_expiry_hours);
        let token = issue_token(&claims, &config.security).unwrap();
        let mut forged = token.clone();
        forged.push('x');
        assert!(matches!(
            verify_token(&forged, &config.security),
            Err(ApiError::Unauthorized)
        ));
    }
}

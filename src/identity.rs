//! Identity provider interface.
//!
//! The backend never issues credentials; it only verifies bearer tokens
//! minted by an external identity service and extracts the verified
//! claims. The `TokenVerifier` trait keeps the provider pluggable; the
//! shipped implementation validates HS256 JWTs.

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verified identity attributes for a valid credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the opaque user id owning the data
    pub sub: String,
    /// Issued-at unix seconds
    pub iat: i64,
    /// Expiration unix seconds
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Malformed, expired, or badly signed token.
    #[error("invalid token: {0}")]
    Invalid(String),

    /// The provider could not be reached; the request may be retried.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// `verify(token) -> claims | failure` against the identity provider.
///
/// Async so remote verifiers (JWKS fetch, introspection endpoint) fit the
/// same seam as the local JWT check.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError>;
}

/// HS256 JWT verifier sharing a secret with the token issuer.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| VerifyError::Invalid(e.to_string()))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Claims;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header};

    /// Mint a token the way the external identity service would.
    pub fn issue_token(secret: &str, sub: &str, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token encoding")
    }
}

//! Session tokens for command-line and API clients
//!
//! - HS256 only, enforced on both encode and decode
//! - Issuer, audience, expiry and not-before are validated

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use corral_core::{CorralError, Result};

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity name
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    /// Unique token identifier
    pub jti: String,
}

/// A freshly issued session token
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_in: i64,
}

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Minimum secret length (256 bits = 32 bytes)
const MIN_SECRET_LENGTH: usize = 32;

/// Issues and validates session tokens
#[derive(Clone)]
pub struct SessionTokenService {
    secret: String,
    issuer: String,
    audience: String,
    expiry_secs: i64,
}

impl SessionTokenService {
    pub fn new(secret: String, issuer: String, expiry_secs: i64) -> Self {
        if secret.len() < MIN_SECRET_LENGTH {
            warn!(
                "Session token secret is only {} bytes, recommended minimum is {} bytes for HS256",
                secret.len(),
                MIN_SECRET_LENGTH
            );
        }
        let audience = issuer.clone();
        Self {
            secret,
            issuer,
            audience,
            expiry_secs,
        }
    }

    #[instrument(skip(self))]
    pub fn issue(&self, identity: &str) -> Result<SessionToken> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + Duration::seconds(self.expiry_secs)).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(JWT_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| CorralError::internal_error(format!("Failed to encode session token: {}", e)))?;

        debug!("Issued session token for {}", identity);
        Ok(SessionToken {
            token,
            expires_in: self.expiry_secs,
        })
    }

    #[instrument(skip(self, token))]
    pub fn validate(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            warn!(error = %e, "Session token validation failed");
            CorralError::unauthenticated(format!("Session token validation failed: {}", e))
        })?;

        if data.claims.sub.is_empty() {
            return Err(CorralError::unauthenticated("Session token has no subject"));
        }
        debug!("Validated session token for {}", data.claims.sub);
        Ok(data.claims)
    }
}

impl std::fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("issuer", &self.issuer)
            .field("expiry_secs", &self.expiry_secs)
            .finish()
    }
}

//! API access tokens

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::LaunchpadError;

/// API token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Username
    pub username: String,

    /// Role
    pub role: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

impl ApiTokenClaims {
    /// Get expiration time
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Sign claims with an HS256 secret
pub fn encode_token(claims: &ApiTokenClaims, secret: &[u8]) -> Result<String, LaunchpadError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| LaunchpadError::TokenError(format!("Failed to sign token: {}", e)))
}

/// Verify the signature and expiry of a token
pub fn decode_token(raw: &str, secret: &[u8]) -> Result<ApiTokenClaims, LaunchpadError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<ApiTokenClaims>(raw, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| LaunchpadError::TokenError(format!("Invalid or expired token: {}", e)))?;
    Ok(token_data.claims)
}

//! Login and token validation

use chrono::Utc;
use openapi_server::models::{LoginResponse, UserInfo};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::app::options::AuthOptions;
use crate::authn::token::{decode_token, encode_token, ApiTokenClaims};
use crate::errors::LaunchpadError;
use crate::storage::settings::UserSettings;
use crate::utils::{constant_time_eq, sha256_hash};

/// Issues and validates API tokens for the configured accounts
pub struct Authenticator {
    secret: SecretString,
    token_ttl_secs: i64,
    users: Vec<UserSettings>,
}

impl Authenticator {
    pub fn new(options: &AuthOptions) -> Result<Self, LaunchpadError> {
        let secret = options.jwt_secret.clone().ok_or_else(|| {
            LaunchpadError::ConfigError(
                "auth.jwt_secret (or JWT_SECRET) must be set".to_string(),
            )
        })?;
        let token_ttl_secs = i64::try_from(options.token_ttl.as_secs()).map_err(|_| {
            LaunchpadError::ConfigError(format!(
                "token lifetime of {}s does not fit a timestamp",
                options.token_ttl.as_secs()
            ))
        })?;
        if options.users.is_empty() {
            warn!("No API users configured, every login will be rejected");
        }

        Ok(Self {
            secret,
            token_ttl_secs,
            users: options.users.clone(),
        })
    }

    /// Check credentials and issue a token
    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse, LaunchpadError> {
        let Some(user) = self.users.iter().find(|u| u.username == username) else {
            warn!("Login attempt for unknown user: {}", username);
            return Err(LaunchpadError::AuthError("Invalid credentials".to_string()));
        };

        let digest = sha256_hash(password.as_bytes());
        if !constant_time_eq(&digest, &user.password_sha256.to_lowercase()) {
            warn!("Login attempt with wrong password for user: {}", username);
            return Err(LaunchpadError::AuthError("Invalid credentials".to_string()));
        }

        let now = Utc::now().timestamp();
        let claims = ApiTokenClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now.saturating_add(self.token_ttl_secs),
        };
        let token = encode_token(&claims, self.secret.expose_secret().as_bytes())?;

        info!("Login succeeded for user: {}", username);
        Ok(LoginResponse {
            token,
            user: user_info(&claims),
        })
    }

    /// Validate a bearer token
    pub fn validate(&self, raw: &str) -> Result<ApiTokenClaims, LaunchpadError> {
        decode_token(raw, self.secret.expose_secret().as_bytes())
    }
}

pub fn user_info(claims: &ApiTokenClaims) -> UserInfo {
    UserInfo {
        id: claims.sub.clone(),
        username: claims.username.clone(),
        role: claims.role.clone(),
    }
}

//! Bearer token extractor

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::authn::token::ApiTokenClaims;
use crate::errors::LaunchpadError;
use crate::server::state::ServerState;

/// Claims of a request carrying a valid `Authorization: Bearer` token
#[derive(Debug, Clone)]
pub struct RequireAuth(pub ApiTokenClaims);

impl FromRequestParts<Arc<ServerState>> for RequireAuth {
    type Rejection = LaunchpadError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| LaunchpadError::Unauthorized("Authentication token not provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| LaunchpadError::Unauthorized("Invalid authentication token".to_string()))?;

        let claims = state.authenticator.validate(token)?;
        Ok(RequireAuth(claims))
    }
}

// =============================================================================
// Admin Token Authentication
// =============================================================================
//
// All authenticated surfaces go through a single validation path,
// `check_token`: REST handlers via the `AuthBearer` extractor (token from the
// `Authorization: Bearer <token>` header), the WebSocket upgrade via its
// `?token=` query parameter.  The expected token comes from the
// `VOLTSCAN_ADMIN_TOKEN` environment variable, re-read per request so that
// rotation needs no restart, and compared in constant time.
// =============================================================================

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

const TOKEN_ENV: &str = "VOLTSCAN_ADMIN_TOKEN";

/// Why a presented token was refused.  Doubles as the Axum rejection for the
/// [`AuthBearer`] extractor; every variant answers 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// `VOLTSCAN_ADMIN_TOKEN` is unset or empty on the server.
    Unconfigured,
    /// The request carried no token at all.
    Missing,
    /// The presented token does not match.
    Mismatch,
}

impl TokenError {
    fn message(self) -> &'static str {
        match self {
            Self::Unconfigured => "server admin token not configured",
            Self::Missing => "no admin token presented",
            Self::Mismatch => "admin token rejected",
        }
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message() });
        (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
    }
}

/// Constant-time byte comparison.  The length difference is folded into the
/// accumulator and every shared-prefix byte is examined regardless of
/// earlier mismatches, so timing reveals nothing about where strings differ.
fn eq_constant_time(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

/// Validate an optionally-presented token against the configured admin
/// token.  The one gate shared by every authenticated surface.
pub fn check_token(presented: Option<&str>) -> Result<(), TokenError> {
    let expected = std::env::var(TOKEN_ENV).unwrap_or_default();
    if expected.is_empty() {
        warn!("{TOKEN_ENV} is not set — rejecting all authenticated requests");
        return Err(TokenError::Unconfigured);
    }

    let presented = presented.ok_or(TokenError::Missing)?;
    if eq_constant_time(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        warn!("request rejected: wrong admin token");
        Err(TokenError::Mismatch)
    }
}

/// Axum extractor yielding the validated raw token.  A bad or absent token
/// short-circuits the request with 403 before the handler body runs.
pub struct AuthBearer(pub String);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = TokenError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        check_token(token)?;
        Ok(AuthBearer(token.unwrap_or_default().to_string()))
    }
}

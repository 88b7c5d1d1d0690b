use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use axum_extra::extract::cookie::CookieJar;
use sprout_types::Id;

use crate::error::{ApiError, run_blocking};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// The authenticated caller. Extracting this on a handler makes the
/// route session-gated; requests without a live session get 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Id);

/// Pull the opaque session token off a request: `Authorization: Bearer`
/// takes precedence, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        return Some(token.to_string());
    }

    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or_else(ApiError::not_authenticated)?;
        let state = state.clone();
        let user = run_blocking(move || Ok(state.sessions.resolve(&token)?))
            .await?
            .ok_or_else(ApiError::not_authenticated)?;
        Ok(AuthUser(user))
    }
}

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::HeaderMap;
use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use sprout_db::models::UserRow;
use sprout_db::now_ts;
use sprout_types::Id;
use sprout_types::api::{
    AuthResponse, CheckAuthResponse, LoginRequest, RegisterRequest, SuccessResponse,
};

use crate::error::{ApiError, ApiResult, bad_request, run_blocking};
use crate::extract::{SESSION_COOKIE, session_token};
use crate::state::AppState;
use crate::users::fetch_user;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn session_cookie(token: &str) -> Cookie<'static> {
    // No Max-Age: the server-side 30-day expiry governs the lifetime.
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .build()
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    if req.email.is_empty() || req.username.is_empty() || req.password.is_empty() {
        return Err(bad_request("Email, username, and password are required"));
    }

    // Argon2 and the store run on the blocking pool
    let (token, user) = run_blocking(move || {
        // Email is checked before username: when both collide, the
        // email conflict is the one reported.
        if state.db.get_user_by_email(&req.email)?.is_some() {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        if state.db.get_user_by_username(&req.username)?.is_some() {
            return Err(ApiError::Conflict("Username already taken".into()));
        }

        let now = now_ts();
        let id = state.db.save_user(&UserRow {
            id: None,
            email: req.email,
            username: req.username,
            password: hash_password(&req.password)?,
            name: req.name,
            location: req.location,
            bio: req.bio,
            profile_pic: req.profile_pic,
            created_at: now.clone(),
            last_login_at: now,
        })?;

        let user = fetch_user(&state, Id::new(id))?
            .ok_or_else(|| ApiError::Internal(anyhow!("user vanished after insert")))?;

        let token = state.sessions.issue(user.id)?;
        Ok((token, user))
    })
    .await?;
    let jar = jar.add(session_cookie(&token));
    Ok((
        jar,
        Json(AuthResponse {
            token,
            user: user.private_profile(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let (token, user) = run_blocking(move || {
        // One generic error for unknown email and wrong password alike,
        // so responses don't reveal which accounts exist.
        let invalid = || ApiError::Unauthorized("Invalid email or password".into());

        let Some(mut row) = state.db.get_user_by_email(&req.email)? else {
            return Err(invalid());
        };
        if !verify_password(&req.password, &row.password) {
            return Err(invalid());
        }

        row.last_login_at = now_ts();
        state.db.save_user(&row)?;

        let user = fetch_user(&state, Id::new(row.id.unwrap_or_default()))?
            .ok_or_else(|| ApiError::Internal(anyhow!("user vanished during login")))?;

        let token = state.sessions.issue(user.id)?;
        Ok((token, user))
    })
    .await?;
    let jar = jar.add(session_cookie(&token));
    Ok((
        jar,
        Json(AuthResponse {
            token,
            user: user.private_profile(),
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> ApiResult<(CookieJar, Json<SuccessResponse>)> {
    if let Some(token) = session_token(&headers) {
        run_blocking(move || Ok(state.sessions.revoke(&token)?)).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(SuccessResponse { success: true })))
}

/// Never an error status; unauthenticated callers just get
/// `{"authenticated": false}`.
pub async fn check_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<CheckAuthResponse>> {
    let user = match session_token(&headers) {
        Some(token) => {
            run_blocking(move || match state.sessions.resolve(&token)? {
                Some(id) => fetch_user(&state, id),
                None => Ok(None),
            })
            .await?
        }
        None => None,
    };

    Ok(Json(CheckAuthResponse {
        authenticated: user.is_some(),
        user: user.map(|u| u.private_profile()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrips() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn verify_against_garbage_hash_is_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn salts_differ_between_calls() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same password", &a));
        assert!(verify_password("same password", &b));
    }
}

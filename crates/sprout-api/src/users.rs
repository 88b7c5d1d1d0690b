use axum::extract::{Path, State};
use axum::Json;
use sprout_types::Id;
use sprout_types::api::UpdateUserRequest;
use sprout_types::models::{PrivateProfile, PublicProfile, User};

use crate::error::{ApiError, ApiResult, not_found, run_blocking};
use crate::extract::AuthUser;
use crate::state::AppState;

/// Load a full user record with its derived favorites set. Malformed or
/// unknown ids both come back as `None`.
pub(crate) fn fetch_user(state: &AppState, id: Id) -> ApiResult<Option<User>> {
    let Some(row) = state.db.get_user(id.raw())? else {
        return Ok(None);
    };
    let favorites = state
        .db
        .get_favorite_ids(id.raw())?
        .into_iter()
        .map(Id::new)
        .collect();
    Ok(Some(row.into_user(favorites)))
}

/// Public-profile projection of a user, without the favorites lookup.
pub(crate) fn fetch_profile(state: &AppState, id: i64) -> ApiResult<Option<PublicProfile>> {
    Ok(state
        .db
        .get_user(id)?
        .map(|row| row.into_user(Vec::new()).public_profile()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicProfile>> {
    let user = run_blocking(move || match Id::from_param(&id) {
        Some(id) => fetch_user(&state, id),
        None => Ok(None),
    })
    .await?;
    let user = user.ok_or_else(|| not_found("User not found"))?;
    Ok(Json(user.public_profile()))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(caller): AuthUser,
    Json(patch): Json<UpdateUserRequest>,
) -> ApiResult<Json<PublicProfile>> {
    // Ownership is checked before existence, matching the reference.
    if Id::from_param(&id) != Some(caller) {
        return Err(ApiError::Forbidden);
    }

    let user = run_blocking(move || {
        let Some(mut row) = state.db.get_user(caller.raw())? else {
            return Err(not_found("User not found"));
        };

        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(location) = patch.location {
            row.location = location;
        }
        if let Some(bio) = patch.bio {
            row.bio = bio;
        }
        if let Some(profile_pic) = patch.profile_pic {
            row.profile_pic = profile_pic;
        }

        state.db.save_user(&row)?;

        fetch_user(&state, caller)?.ok_or_else(|| not_found("User not found"))
    })
    .await?;
    Ok(Json(user.public_profile()))
}

pub async fn get_current_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<PrivateProfile>> {
    let user = run_blocking(move || {
        fetch_user(&state, caller)?.ok_or_else(|| not_found("User not found"))
    })
    .await?;
    Ok(Json(user.private_profile()))
}

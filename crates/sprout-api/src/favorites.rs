use axum::Json;
use axum::extract::State;
use sprout_types::Id;
use sprout_types::api::{ListingWithUser, SuccessResponse, ToggleFavoriteRequest};

use crate::error::{ApiResult, bad_request, not_found, run_blocking};
use crate::extract::AuthUser;
use crate::state::AppState;
use crate::users::fetch_profile;

/// Add is idempotent-false-on-repeat: favoriting an already-favorited
/// listing answers `success: false`, not an error. Remove reports
/// whether a row actually went away.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ToggleFavoriteRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let success = run_blocking(move || {
        // The listing must exist before the action is considered.
        let listing = match Id::from_param(&req.listing_id) {
            Some(id) => state.db.get_listing(id.raw())?,
            None => None,
        };
        let listing = listing.ok_or_else(|| not_found("Listing not found"))?;
        let listing_id = listing.id.unwrap_or_default();

        match req.action.as_str() {
            "add" => Ok(state.db.add_favorite(user.raw(), listing_id)?),
            "remove" => Ok(state.db.remove_favorite(user.raw(), listing_id)?),
            _ => Err(bad_request("Invalid action, must be 'add' or 'remove'")),
        }
    })
    .await?;

    Ok(Json(SuccessResponse { success }))
}

pub async fn get_favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<ListingWithUser>>> {
    let out = run_blocking(move || {
        let mut out = Vec::new();
        for listing_id in state.db.get_favorite_ids(user.raw())? {
            // Listings or owners that no longer resolve are skipped silently
            let Some(row) = state.db.get_listing(listing_id)? else {
                continue;
            };
            let Some(owner) = fetch_profile(&state, row.user_id)? else {
                continue;
            };
            out.push(ListingWithUser {
                listing: row.into_listing(),
                user: owner,
            });
        }
        Ok(out)
    })
    .await?;

    Ok(Json(out))
}

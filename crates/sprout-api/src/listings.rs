use anyhow::anyhow;
use axum::Json;
use axum::extract::{Path, Query, State};
use sprout_db::models::ListingRow;
use sprout_db::now_ts;
use sprout_types::Id;
use sprout_types::api::{
    CreateListingRequest, ListingFilter, ListingWithUser, SearchQuery, SuccessResponse,
    UpdateListingRequest,
};
use sprout_types::models::Listing;

use crate::error::{ApiError, ApiResult, bad_request, not_found, run_blocking};
use crate::extract::AuthUser;
use crate::state::AppState;
use crate::users::fetch_profile;

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.filter(|s| !s.is_empty())
}

/// All filters are conjunctive; an absent (or empty) filter is no
/// constraint. Listings whose owner no longer resolves are dropped, not
/// errors.
pub async fn list_listings(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> ApiResult<Json<Vec<ListingWithUser>>> {
    let out = run_blocking(move || {
        let owner = match non_empty(filter.user_id.as_deref()) {
            Some(raw) => match Id::from_param(raw) {
                Some(id) => Some(id.raw()),
                // A malformed owner filter matches nothing.
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let listing_type = non_empty(filter.listing_type.as_deref());
        let plant_type = non_empty(filter.plant_type.as_deref());
        let location = non_empty(filter.location.as_deref()).map(|s| s.to_lowercase());

        let mut out = Vec::new();
        for row in state.db.get_listings(owner)? {
            if let Some(t) = listing_type
                && row.listing_type != t
            {
                continue;
            }
            if let Some(p) = plant_type
                && row.plant_type != p
            {
                continue;
            }
            if let Some(loc) = &location
                && !row.location.to_lowercase().contains(loc)
            {
                continue;
            }

            let Some(user) = fetch_profile(&state, row.user_id)? else {
                continue;
            };
            out.push(ListingWithUser {
                listing: row.into_listing(),
                user,
            });
        }

        Ok(out)
    })
    .await?;

    Ok(Json(out))
}

/// Case-insensitive substring match over title, description, or plant
/// type.
pub async fn search_listings(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<ListingWithUser>>> {
    if query.q.is_empty() {
        return Err(bad_request("Search query is required"));
    }
    let needle = query.q.to_lowercase();

    let out = run_blocking(move || {
        let mut out = Vec::new();
        for row in state.db.get_listings(None)? {
            let matched = row.title.to_lowercase().contains(&needle)
                || row.description.to_lowercase().contains(&needle)
                || row.plant_type.to_lowercase().contains(&needle);
            if !matched {
                continue;
            }

            let Some(user) = fetch_profile(&state, row.user_id)? else {
                continue;
            };
            out.push(ListingWithUser {
                listing: row.into_listing(),
                user,
            });
        }
        Ok(out)
    })
    .await?;

    Ok(Json(out))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ListingWithUser>> {
    let (row, user) = run_blocking(move || {
        let row = match Id::from_param(&id) {
            Some(id) => state.db.get_listing(id.raw())?,
            None => None,
        };
        let row = row.ok_or_else(|| not_found("Listing not found"))?;

        let user = fetch_profile(&state, row.user_id)?.ok_or_else(|| {
            ApiError::Internal(anyhow!("listing owner missing for {:?}", row.id))
        })?;
        Ok((row, user))
    })
    .await?;

    Ok(Json(ListingWithUser {
        listing: row.into_listing(),
        user,
    }))
}

pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Json(req): Json<CreateListingRequest>,
) -> ApiResult<Json<Listing>> {
    if req.title.is_empty() || req.description.is_empty() || req.listing_type.is_empty() {
        return Err(bad_request("Title, description, and type are required"));
    }

    let now = now_ts();
    let status = if req.status.is_empty() {
        "available".to_string()
    } else {
        req.status
    };

    let row = run_blocking(move || {
        let id = state.db.save_listing(&ListingRow {
            id: None,
            user_id: owner.raw(),
            title: req.title,
            description: req.description,
            listing_type: req.listing_type,
            plant_type: req.plant_type,
            price: req.price,
            trade_for: req.trade_for,
            location: req.location,
            images: req.images,
            created_at: now.clone(),
            updated_at: now,
            status,
        })?;

        state
            .db
            .get_listing(id)?
            .ok_or_else(|| ApiError::Internal(anyhow!("listing vanished after insert")))
    })
    .await?;
    Ok(Json(row.into_listing()))
}

pub async fn update_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(caller): AuthUser,
    Json(patch): Json<UpdateListingRequest>,
) -> ApiResult<Json<Listing>> {
    let row = run_blocking(move || {
        let row = match Id::from_param(&id) {
            Some(id) => state.db.get_listing(id.raw())?,
            None => None,
        };
        let mut row = row.ok_or_else(|| not_found("Listing not found"))?;

        if row.user_id != caller.raw() {
            return Err(ApiError::Forbidden);
        }

        if let Some(title) = patch.title {
            row.title = title;
        }
        if let Some(description) = patch.description {
            row.description = description;
        }
        if let Some(listing_type) = patch.listing_type {
            row.listing_type = listing_type;
        }
        if let Some(plant_type) = patch.plant_type {
            row.plant_type = plant_type;
        }
        if let Some(price) = patch.price {
            row.price = price;
        }
        if let Some(trade_for) = patch.trade_for {
            row.trade_for = trade_for;
        }
        if let Some(location) = patch.location {
            row.location = location;
        }
        if let Some(images) = patch.images {
            row.images = images;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }

        row.updated_at = now_ts();
        state.db.save_listing(&row)?;

        let id = row.id.unwrap_or_default();
        state
            .db
            .get_listing(id)?
            .ok_or_else(|| ApiError::Internal(anyhow!("listing vanished after update")))
    })
    .await?;
    Ok(Json(row.into_listing()))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<SuccessResponse>> {
    run_blocking(move || {
        let row = match Id::from_param(&id) {
            Some(id) => state.db.get_listing(id.raw())?,
            None => None,
        };
        let row = row.ok_or_else(|| not_found("Listing not found"))?;

        if row.user_id != caller.raw() {
            return Err(ApiError::Forbidden);
        }

        if !state.db.delete_listing(row.id.unwrap_or_default())? {
            return Err(ApiError::Internal(anyhow!("delete affected no rows")));
        }
        Ok(())
    })
    .await?;

    Ok(Json(SuccessResponse { success: true }))
}

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;
use crate::{auth, favorites, listings, messages, users};

/// The `/api` surface. Session gating happens per-handler via the
/// [`crate::extract::AuthUser`] extractor.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/check-auth", get(auth::check_auth))
        .route("/users/current", get(users::get_current_user))
        .route("/users/{id}", get(users::get_user).put(users::update_user))
        .route(
            "/listings",
            get(listings::list_listings).post(listings::create_listing),
        )
        .route("/listings/search", get(listings::search_listings))
        .route(
            "/listings/{id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route(
            "/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/messages/{id}", get(messages::get_message))
        .route("/conversations", get(messages::get_conversations))
        .route("/conversations/{user_id}", get(messages::get_conversation))
        .route(
            "/favorites",
            get(favorites::get_favorites).post(favorites::toggle_favorite),
        )
        .with_state(state);

    Router::new().nest("/api", api)
}

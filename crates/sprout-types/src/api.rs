use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Id;
use crate::models::{Listing, Message, PrivateProfile, PublicProfile};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_pic: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The session token is returned in the body for Bearer clients and also
/// set as the `session` cookie.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PrivateProfile,
}

#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PrivateProfile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// -- Users --

/// Patch body: absent fields leave the profile untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

// -- Listings --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub listing_type: String,
    #[serde(default)]
    pub plant_type: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub trade_for: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: String,
}

/// Patch body for listings. `images`, when present, fully replaces the
/// stored set.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub plant_type: Option<String>,
    pub price: Option<f64>,
    pub trade_for: Option<String>,
    pub location: Option<String>,
    pub images: Option<Vec<String>>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub plant_type: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct ListingWithUser {
    #[serde(flatten)]
    pub listing: Listing,
    pub user: PublicProfile,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub to_id: String,
    #[serde(default)]
    pub listing_id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithUser {
    #[serde(flatten)]
    pub message: Message,
    pub from_user: PublicProfile,
    pub to_user: PublicProfile,
    pub listing: Listing,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user_id: Id,
    pub username: String,
    pub profile_pic: String,
    pub last_message: String,
    pub last_activity: DateTime<Utc>,
    pub unread: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub user_id: Id,
    pub username: String,
    pub profile_pic: String,
    pub messages: Vec<MessageWithUser>,
    pub unread: usize,
}

// -- Favorites --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteRequest {
    #[serde(default)]
    pub listing_id: String,
    /// "add" or "remove"
    #[serde(default)]
    pub action: String,
}

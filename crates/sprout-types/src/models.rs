use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Id;

/// Full user record as the domain sees it. Never serialized outward —
/// responses go through [`PublicProfile`] or [`PrivateProfile`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub location: String,
    pub bio: String,
    pub profile_pic: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    /// Derived from the favorites table, not stored on the user row.
    pub favorites: Vec<Id>,
}

/// The subset of a user record safe to show other users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Id,
    pub username: String,
    pub name: String,
    pub location: String,
    pub bio: String,
    pub profile_pic: String,
    pub created_at: DateTime<Utc>,
}

/// What a user sees of their own account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateProfile {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub name: String,
    pub location: String,
    pub bio: String,
    pub profile_pic: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    pub favorites: Vec<Id>,
}

impl User {
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
            bio: self.bio.clone(),
            profile_pic: self.profile_pic.clone(),
            created_at: self.created_at,
        }
    }

    pub fn private_profile(&self) -> PrivateProfile {
        PrivateProfile {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
            bio: self.bio.clone(),
            profile_pic: self.profile_pic.clone(),
            created_at: self.created_at,
            last_login_at: self.last_login_at,
            favorites: self.favorites.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub description: String,
    /// plant, seed, cutting
    #[serde(rename = "type")]
    pub listing_type: String,
    /// indoor, outdoor, vegetable, herb, ...
    pub plant_type: String,
    pub price: f64,
    /// What the owner is willing to trade for.
    pub trade_for: String,
    pub location: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// available, pending, sold, traded
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Id,
    pub from_id: Id,
    pub to_id: Id,
    /// Absent once the referenced listing is deleted (FK SET NULL).
    pub listing_id: Option<Id>,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

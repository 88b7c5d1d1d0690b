//! Database row types — these map directly to SQLite rows.
//! Distinct from the sprout-types API models to keep the DB layer
//! independent. `id: None` means "not yet persisted": saving such a row
//! inserts, saving a row with an id updates.

use sprout_types::Id;
use sprout_types::models::{Listing, Message, User};

use crate::parse_ts;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Option<i64>,
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub location: String,
    pub bio: String,
    pub profile_pic: String,
    pub created_at: String,
    pub last_login_at: String,
}

impl UserRow {
    pub fn into_user(self, favorites: Vec<Id>) -> User {
        User {
            id: Id::new(self.id.unwrap_or_default()),
            email: self.email,
            username: self.username,
            password_hash: self.password,
            name: self.name,
            location: self.location,
            bio: self.bio,
            profile_pic: self.profile_pic,
            created_at: parse_ts(&self.created_at),
            last_login_at: parse_ts(&self.last_login_at),
            favorites,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingRow {
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub listing_type: String,
    pub plant_type: String,
    pub price: f64,
    pub trade_for: String,
    pub location: String,
    pub images: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub status: String,
}

impl ListingRow {
    pub fn into_listing(self) -> Listing {
        Listing {
            id: Id::new(self.id.unwrap_or_default()),
            user_id: Id::new(self.user_id),
            title: self.title,
            description: self.description,
            listing_type: self.listing_type,
            plant_type: self.plant_type,
            price: self.price,
            trade_for: self.trade_for,
            location: self.location,
            images: self.images,
            created_at: parse_ts(&self.created_at),
            updated_at: parse_ts(&self.updated_at),
            status: self.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: Option<i64>,
    pub from_id: i64,
    pub to_id: i64,
    pub listing_id: Option<i64>,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Message {
        Message {
            id: Id::new(self.id.unwrap_or_default()),
            from_id: Id::new(self.from_id),
            to_id: Id::new(self.to_id),
            listing_id: self.listing_id.map(Id::new),
            content: self.content,
            read: self.read,
            created_at: parse_ts(&self.created_at),
        }
    }
}

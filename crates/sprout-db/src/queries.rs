use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::{ListingRow, MessageRow, UserRow};

impl Database {
    // -- Users --

    /// Insert when the row has no id, update when it does. Updates never
    /// touch created_at.
    pub fn save_user(&self, row: &UserRow) -> Result<i64> {
        self.with_conn(|conn| match row.id {
            None => {
                conn.execute(
                    "INSERT INTO users (email, username, password, name, location, bio, profile_pic, created_at, last_login_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        row.email,
                        row.username,
                        row.password,
                        row.name,
                        row.location,
                        row.bio,
                        row.profile_pic,
                        row.created_at,
                        row.last_login_at
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }
            Some(id) => {
                conn.execute(
                    "UPDATE users
                     SET email = ?1, username = ?2, password = ?3, name = ?4,
                         location = ?5, bio = ?6, profile_pic = ?7, last_login_at = ?8
                     WHERE id = ?9",
                    params![
                        row.email,
                        row.username,
                        row.password,
                        row.name,
                        row.location,
                        row.bio,
                        row.profile_pic,
                        row.last_login_at,
                        id
                    ],
                )?;
                Ok(id)
            }
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &[&id]))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", &[&email]))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", &[&username]))
    }

    pub fn has_users(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(n > 0)
        })
    }

    // -- Listings --

    /// Upsert by id presence. The listing row and its image rows are
    /// written in one transaction; the image set is fully replaced on
    /// update, never merged.
    pub fn save_listing(&self, row: &ListingRow) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let id = match row.id {
                None => {
                    tx.execute(
                        "INSERT INTO listings (user_id, title, description, type, plant_type, price, trade_for, location, created_at, updated_at, status)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        params![
                            row.user_id,
                            row.title,
                            row.description,
                            row.listing_type,
                            row.plant_type,
                            row.price,
                            row.trade_for,
                            row.location,
                            row.created_at,
                            row.updated_at,
                            row.status
                        ],
                    )?;
                    tx.last_insert_rowid()
                }
                Some(id) => {
                    tx.execute(
                        "UPDATE listings
                         SET title = ?1, description = ?2, type = ?3, plant_type = ?4,
                             price = ?5, trade_for = ?6, location = ?7, updated_at = ?8, status = ?9
                         WHERE id = ?10",
                        params![
                            row.title,
                            row.description,
                            row.listing_type,
                            row.plant_type,
                            row.price,
                            row.trade_for,
                            row.location,
                            row.updated_at,
                            row.status,
                            id
                        ],
                    )?;
                    id
                }
            };

            tx.execute("DELETE FROM listing_images WHERE listing_id = ?1", [id])?;
            for url in &row.images {
                tx.execute(
                    "INSERT INTO listing_images (listing_id, image_url) VALUES (?1, ?2)",
                    params![id, url],
                )?;
            }

            tx.commit()?;
            Ok(id)
        })
    }

    pub fn get_listing(&self, id: i64) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {LISTING_COLS} FROM listings WHERE id = ?1"),
                    [id],
                    read_listing,
                )
                .optional()?;

            let Some(mut listing) = row else {
                return Ok(None);
            };
            listing.images = query_images(conn, id)?;
            Ok(Some(listing))
        })
    }

    /// All listings, newest first, optionally restricted to one owner.
    pub fn get_listings(&self, owner: Option<i64>) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut rows = match owner {
                Some(user_id) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {LISTING_COLS} FROM listings WHERE user_id = ?1 ORDER BY created_at DESC"
                    ))?;
                    let rows = stmt
                        .query_map([user_id], read_listing)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {LISTING_COLS} FROM listings ORDER BY created_at DESC"
                    ))?;
                    let rows = stmt
                        .query_map([], read_listing)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };

            // Batch image load to avoid one query per listing
            let ids: Vec<i64> = rows.iter().filter_map(|r| r.id).collect();
            let mut images = query_images_batch(conn, &ids)?;
            for row in &mut rows {
                if let Some(id) = row.id {
                    row.images = images.remove(&id).unwrap_or_default();
                }
            }

            Ok(rows)
        })
    }

    /// Returns whether a row was actually removed. Image rows go with it
    /// via the FK cascade.
    pub fn delete_listing(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM listings WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, row: &MessageRow) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (from_id, to_id, listing_id, content, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.from_id,
                    row.to_id,
                    row.listing_id,
                    row.content,
                    row.read,
                    row.created_at
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
                    [id],
                    read_message,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Everything the user sent or received, newest first.
    pub fn get_messages_for_user(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE from_id = ?1 OR to_id = ?1
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], read_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Both directions between two users, oldest first.
    pub fn get_messages_between(&self, a: i64, b: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages
                 WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt
                .query_map([a, b], read_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// false→true only; returns whether the flag actually flipped.
    pub fn mark_message_read(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE messages SET read = 1 WHERE id = ?1 AND read = 0",
                [id],
            )?;
            Ok(n > 0)
        })
    }

    // -- Favorites --

    /// The UNIQUE(user_id, listing_id) constraint arbitrates concurrent
    /// adds; an already-favorited pair reports false, not an error.
    pub fn add_favorite(&self, user_id: i64, listing_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO favorites (user_id, listing_id) VALUES (?1, ?2)",
                params![user_id, listing_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn remove_favorite(&self, user_id: i64, listing_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM favorites WHERE user_id = ?1 AND listing_id = ?2",
                params![user_id, listing_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn get_favorite_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT listing_id FROM favorites WHERE user_id = ?1 ORDER BY id DESC",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    // -- Sessions --

    pub fn create_session(&self, token: &str, user_id: i64, expires_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
                params![token, user_id, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn session_user(&self, token: &str, now: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let user_id = conn
                .query_row(
                    "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
                    params![token, now],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(user_id)
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(n > 0)
        })
    }

    pub fn purge_expired_sessions(&self, now: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?;
            Ok(n)
        })
    }
}

const LISTING_COLS: &str =
    "id, user_id, title, description, type, plant_type, price, trade_for, location, created_at, updated_at, status";

const MESSAGE_COLS: &str = "id, from_id, to_id, listing_id, content, read, created_at";

fn query_user(
    conn: &Connection,
    predicate: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, email, username, password, name, location, bio, profile_pic, created_at, last_login_at
         FROM users WHERE {predicate}"
    );
    let row = conn
        .query_row(&sql, params, |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                username: row.get(2)?,
                password: row.get(3)?,
                name: row.get(4)?,
                location: row.get(5)?,
                bio: row.get(6)?,
                profile_pic: row.get(7)?,
                created_at: row.get(8)?,
                last_login_at: row.get(9)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn read_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        listing_type: row.get(4)?,
        plant_type: row.get(5)?,
        price: row.get(6)?,
        trade_for: row.get(7)?,
        location: row.get(8)?,
        images: Vec::new(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        status: row.get(11)?,
    })
}

fn read_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        from_id: row.get(1)?,
        to_id: row.get(2)?,
        listing_id: row.get(3)?,
        content: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_images(conn: &Connection, listing_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT image_url FROM listing_images WHERE listing_id = ?1 ORDER BY id")?;
    let urls = stmt
        .query_map([listing_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(urls)
}

/// Batch-fetch image urls for a set of listing ids.
fn query_images_batch(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT listing_id, image_url FROM listing_images WHERE listing_id IN ({}) ORDER BY id",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let mut map: HashMap<i64, Vec<String>> = HashMap::new();
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (listing_id, url) = row?;
        map.entry(listing_id).or_default().push(url);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now_ts;

    fn seed_user(db: &Database, email: &str, username: &str) -> i64 {
        let now = now_ts();
        db.save_user(&UserRow {
            id: None,
            email: email.into(),
            username: username.into(),
            password: "hash".into(),
            name: String::new(),
            location: String::new(),
            bio: String::new(),
            profile_pic: String::new(),
            created_at: now.clone(),
            last_login_at: now,
        })
        .unwrap()
    }

    fn seed_listing(db: &Database, user_id: i64, title: &str, images: &[&str]) -> i64 {
        let now = now_ts();
        db.save_listing(&ListingRow {
            id: None,
            user_id,
            title: title.into(),
            description: "desc".into(),
            listing_type: "plant".into(),
            plant_type: "indoor".into(),
            price: 5.0,
            trade_for: String::new(),
            location: "Oslo".into(),
            images: images.iter().map(|s| s.to_string()).collect(),
            created_at: now.clone(),
            updated_at: now,
            status: "available".into(),
        })
        .unwrap()
    }

    fn send(db: &Database, from: i64, to: i64, listing: Option<i64>, content: &str) -> i64 {
        db.insert_message(&MessageRow {
            id: None,
            from_id: from,
            to_id: to,
            listing_id: listing,
            content: content.into(),
            read: false,
            created_at: now_ts(),
        })
        .unwrap()
    }

    #[test]
    fn user_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "a@x.io", "anna");

        let row = db.get_user(id).unwrap().unwrap();
        assert_eq!(row.email, "a@x.io");
        assert_eq!(row.username, "anna");
        assert!(db.get_user_by_email("a@x.io").unwrap().is_some());
        assert!(db.get_user_by_email("A@X.IO").unwrap().is_none()); // byte-exact
        assert!(db.get_user(id + 1).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_rejected_by_constraint() {
        let db = Database::open_in_memory().unwrap();
        seed_user(&db, "a@x.io", "anna");

        let now = now_ts();
        let err = db.save_user(&UserRow {
            id: None,
            email: "a@x.io".into(),
            username: "other".into(),
            password: "hash".into(),
            name: String::new(),
            location: String::new(),
            bio: String::new(),
            profile_pic: String::new(),
            created_at: now.clone(),
            last_login_at: now,
        });
        assert!(err.is_err());
    }

    #[test]
    fn listing_images_fully_replaced_on_update() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "a@x.io", "anna");
        let id = seed_listing(&db, user, "Monstera", &["a.jpg", "b.jpg"]);

        let mut row = db.get_listing(id).unwrap().unwrap();
        assert_eq!(row.images, vec!["a.jpg", "b.jpg"]);

        row.images = vec!["c.jpg".into()];
        db.save_listing(&row).unwrap();

        let row = db.get_listing(id).unwrap().unwrap();
        assert_eq!(row.images, vec!["c.jpg"]);
    }

    #[test]
    fn delete_listing_cascades_images() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "a@x.io", "anna");
        let id = seed_listing(&db, user, "Monstera", &["a.jpg"]);

        assert!(db.delete_listing(id).unwrap());
        assert!(db.get_listing(id).unwrap().is_none());
        assert!(!db.delete_listing(id).unwrap());

        let orphans: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM listing_images", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn deleting_listing_nulls_message_reference() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a@x.io", "anna");
        let b = seed_user(&db, "b@x.io", "bo");
        let listing = seed_listing(&db, a, "Fern", &[]);
        let msg = send(&db, b, a, Some(listing), "still got it?");

        db.delete_listing(listing).unwrap();

        let row = db.get_message(msg).unwrap().unwrap();
        assert_eq!(row.listing_id, None);
    }

    #[test]
    fn listings_newest_first_and_owner_filtered() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a@x.io", "anna");
        let b = seed_user(&db, "b@x.io", "bo");
        seed_listing(&db, a, "first", &[]);
        std::thread::sleep(std::time::Duration::from_millis(2));
        seed_listing(&db, b, "second", &[]);

        let all = db.get_listings(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "second");

        let mine = db.get_listings(Some(a)).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "first");
    }

    #[test]
    fn favorite_add_is_idempotent_false() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "a@x.io", "anna");
        let listing = seed_listing(&db, user, "Fern", &[]);

        assert!(db.add_favorite(user, listing).unwrap());
        assert!(!db.add_favorite(user, listing).unwrap());
        assert_eq!(db.get_favorite_ids(user).unwrap(), vec![listing]);

        assert!(db.remove_favorite(user, listing).unwrap());
        assert!(!db.remove_favorite(user, listing).unwrap());
    }

    #[test]
    fn messages_between_are_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a@x.io", "anna");
        let b = seed_user(&db, "b@x.io", "bo");
        send(&db, a, b, None, "hi");
        std::thread::sleep(std::time::Duration::from_millis(2));
        send(&db, b, a, None, "hello");

        let thread = db.get_messages_between(a, b).unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].content, "hi");
        assert_eq!(thread[1].content, "hello");
    }

    #[test]
    fn read_flag_flips_once() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a@x.io", "anna");
        let b = seed_user(&db, "b@x.io", "bo");
        let id = send(&db, a, b, None, "hi");

        assert!(db.mark_message_read(id).unwrap());
        assert!(!db.mark_message_read(id).unwrap());
        assert!(db.get_message(id).unwrap().unwrap().read);
    }

    #[test]
    fn sessions_expire() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "a@x.io", "anna");

        db.create_session("live", user, "2999-01-01T00:00:00.000000Z")
            .unwrap();
        db.create_session("dead", user, "2000-01-01T00:00:00.000000Z")
            .unwrap();

        let now = now_ts();
        assert_eq!(db.session_user("live", &now).unwrap(), Some(user));
        assert_eq!(db.session_user("dead", &now).unwrap(), None);

        assert_eq!(db.purge_expired_sessions(&now).unwrap(), 1);
        assert!(db.delete_session("live").unwrap());
        assert_eq!(db.session_user("live", &now).unwrap(), None);
    }
}

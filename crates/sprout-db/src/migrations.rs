use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            email         TEXT NOT NULL UNIQUE,
            username      TEXT NOT NULL UNIQUE,
            password      TEXT NOT NULL,
            name          TEXT NOT NULL DEFAULT '',
            location      TEXT NOT NULL DEFAULT '',
            bio           TEXT NOT NULL DEFAULT '',
            profile_pic   TEXT NOT NULL DEFAULT '',
            created_at    TEXT NOT NULL,
            last_login_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS listings (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            type        TEXT NOT NULL,
            plant_type  TEXT NOT NULL DEFAULT '',
            price       REAL NOT NULL DEFAULT 0,
            trade_for   TEXT NOT NULL DEFAULT '',
            location    TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'available'
        );

        CREATE INDEX IF NOT EXISTS idx_listings_user
            ON listings(user_id);
        CREATE INDEX IF NOT EXISTS idx_listings_created
            ON listings(created_at);

        CREATE TABLE IF NOT EXISTS listing_images (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            listing_id  INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            image_url   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_listing_images_listing
            ON listing_images(listing_id);

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            from_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            to_id       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            listing_id  INTEGER REFERENCES listings(id) ON DELETE SET NULL,
            content     TEXT NOT NULL,
            read        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_from
            ON messages(from_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_to
            ON messages(to_id, created_at);

        CREATE TABLE IF NOT EXISTS favorites (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            listing_id  INTEGER NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            UNIQUE(user_id, listing_id)
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token       TEXT PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_expiry
            ON sessions(expires_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

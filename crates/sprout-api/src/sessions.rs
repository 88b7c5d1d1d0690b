use std::sync::Arc;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use sprout_db::{Database, format_ts, now_ts};
use sprout_types::Id;

pub const SESSION_TTL_DAYS: i64 = 30;

/// Opaque-token session store backed by the sessions table. Tokens are
/// 32 random bytes in URL-safe base64; expiry is fixed at issuance, no
/// sliding renewal.
#[derive(Clone)]
pub struct SessionProvider {
    db: Arc<Database>,
}

impl SessionProvider {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn issue(&self, user: Id) -> Result<String> {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let expires_at = format_ts(Utc::now() + Duration::days(SESSION_TTL_DAYS));
        self.db.create_session(&token, user.raw(), &expires_at)?;
        Ok(token)
    }

    /// Resolve a presented token to a user id. Unknown and expired
    /// tokens both come back as `None`.
    pub fn resolve(&self, token: &str) -> Result<Option<Id>> {
        Ok(self.db.session_user(token, &now_ts())?.map(Id::new))
    }

    /// Destroying a token is the whole revocation story; there is no
    /// separate revocation list.
    pub fn revoke(&self, token: &str) -> Result<bool> {
        self.db.delete_session(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_resolve_revoke() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = seed_user(&db);
        let sessions = SessionProvider::new(db);

        let token = sessions.issue(user).unwrap();
        assert_eq!(sessions.resolve(&token).unwrap(), Some(user));

        assert!(sessions.revoke(&token).unwrap());
        assert_eq!(sessions.resolve(&token).unwrap(), None);
        assert!(!sessions.revoke(&token).unwrap());
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = seed_user(&db);
        let sessions = SessionProvider::new(db);

        let a = sessions.issue(user).unwrap();
        let b = sessions.issue(user).unwrap();
        assert_ne!(a, b);
    }

    fn seed_user(db: &Database) -> Id {
        let now = now_ts();
        let id = db
            .save_user(&sprout_db::models::UserRow {
                id: None,
                email: "a@x.io".into(),
                username: "anna".into(),
                password: "hash".into(),
                name: String::new(),
                location: String::new(),
                bio: String::new(),
                profile_pic: String::new(),
                created_at: now.clone(),
                last_login_at: now,
            })
            .unwrap();
        Id::new(id)
    }
}

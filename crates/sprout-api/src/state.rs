use std::sync::Arc;

use sprout_db::Database;

use crate::sessions::SessionProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub sessions: SessionProvider,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        let db = Arc::new(db);
        Arc::new(Self {
            sessions: SessionProvider::new(db.clone()),
            db,
        })
    }
}

pub mod auth;
pub mod error;
pub mod extract;
pub mod favorites;
pub mod listings;
pub mod messages;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod users;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::{AppState, AppStateInner};

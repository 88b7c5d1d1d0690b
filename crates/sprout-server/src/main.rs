mod seed;

use std::net::SocketAddr;
use std::path::PathBuf;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use sprout_api::AppStateInner;
use sprout_db::{Database, now_ts};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sprout=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("SPROUT_DB_PATH").unwrap_or_else(|_| "sprout.db".into());
    let host = std::env::var("SPROUT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SPROUT_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;

    // Init database
    let db = Database::open(&PathBuf::from(&db_path))?;

    let purged = db.purge_expired_sessions(&now_ts())?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    if std::env::var("SPROUT_SEED_DEMO").is_ok() {
        seed::create_sample_data(&db)?;
    }

    let state = AppStateInner::new(db);

    let app = sprout_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Sprout server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

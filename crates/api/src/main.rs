use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reliquary_api::config::ServerConfig;
use reliquary_api::router::build_app_router;
use reliquary_api::state::AppState;
use reliquary_core::envelope::EnvelopeKey;
use reliquary_pipeline::AnnotationStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reliquary_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = reliquary_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    reliquary_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    reliquary_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Upload root ---
    tokio::fs::create_dir_all(&config.upload_root)
        .await
        .expect("Failed to create upload root directory");

    // --- Annotation store ---
    // The encryption toggle is decided exactly once, here, for the whole
    // process lifetime.
    let key = config.annotation_secret.as_deref().map(EnvelopeKey::from_secret);
    let encryption = key.is_some();
    let store = Arc::new(AnnotationStore::new(key, config.upload_root.clone()));
    tracing::info!(encryption, "Annotation store initialized");

    // --- Router / server ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        store,
    };
    let app = build_app_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}

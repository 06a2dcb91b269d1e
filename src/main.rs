use rusty_library_lending::{
    adapters::{memory::InMemoryLibraryStore, postgres::PostgresLibraryStore},
    api::{handlers::AppState, router::create_router},
    application::lending::ServiceDependencies,
    config::Config,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_library_lending=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Initialize adapters
    let service_deps = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Using PostgreSQL storage");

            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            ServiceDependencies::from_store(Arc::new(PostgresLibraryStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using in-memory storage");
            ServiceDependencies::from_store(Arc::new(InMemoryLibraryStore::new()))
        }
    };

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}

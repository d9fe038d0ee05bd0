//! inkpost - article service with token-based sessions

use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpost::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{CacheSessionRepository, SqlxArticleRepository, SqlxUserRepository},
    },
    services::{ArticleService, TokenMaker, UserService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpost=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting inkpost...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!(
        session_driver = ?config.session.driver,
        access_ttl_secs = config.token.access_token_duration_secs,
        refresh_ttl_secs = config.token.refresh_token_duration_secs,
        "Configuration loaded"
    );

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;

    // Session store
    let cache = create_cache(&config.session).await?;
    tracing::info!("Session store initialized");

    let token_maker = Arc::new(TokenMaker::new(&config.token.symmetric_key)?);

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let article_repo = SqlxArticleRepository::boxed(pool.clone());
    let session_repo = CacheSessionRepository::boxed(cache);

    // Initialize services
    let user_service = Arc::new(UserService::new(
        user_repo,
        session_repo.clone(),
        token_maker.clone(),
        &config.token,
    ));
    let article_service = Arc::new(ArticleService::new(article_repo));

    let state = AppState {
        pool: pool.clone(),
        token_maker,
        session_repo,
        user_service,
        article_service,
    };

    let app = api::build_router(state, &config.server)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

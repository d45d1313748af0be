use std::net::SocketAddr;
use std::sync::Arc;

use book_image_backend::api::{self, AppState};
use book_image_backend::config::AppConfig;
use book_image_backend::logging;
use book_image_backend::models::CacheBackend;
use book_image_backend::services::{
    BookImageService, CacheCleanupTask, CacheManager, FileCacheStore, HttpPageFetcher,
    ImageExtractor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (.env + environment variables)
    let config = AppConfig::from_env();

    // Initialize tracing
    logging::init(&config.log_level, config.log_file.as_deref())?;
    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!("Environment: {}", config.app_env.as_str());

    // Select the cache backend once
    let cache = CacheManager::from_settings(&config.cache).await?;

    // Start cache cleanup task when running on the file cache
    if cache.backend() == CacheBackend::Fallback {
        let store = Arc::new(FileCacheStore::new(&config.cache.cache_dir).await?);
        let cleanup_task = CacheCleanupTask::new(store, config.cleanup_interval);
        tokio::spawn(cleanup_task.start());
        tracing::info!(
            "📊 Cache cleanup task started (interval: {} seconds)",
            config.cleanup_interval.as_secs()
        );
    }

    let fetcher = HttpPageFetcher::new(config.connect_timeout, config.user_agents.clone())?;
    let service = BookImageService::new(
        Arc::new(fetcher),
        ImageExtractor::default(),
        cache,
        config.host_validator(),
        config.fetch_timeout(),
    );

    let app = api::create_router(AppState::new(service));

    let addr: SocketAddr = config.bind_address().parse()?;
    tracing::info!("🚀 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

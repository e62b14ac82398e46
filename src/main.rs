use price_tracker::database::repositories::{
    InMemoryPriceRepository, InMemorySymbolRepository, PriceRepository, PriceRepositoryImpl,
    SymbolRepository, SymbolRepositoryImpl,
};
use price_tracker::cache::{CacheStore, MemoryCacheStore, RedisCacheStore};
use price_tracker::jobs::{CachePurgeJob, RetentionJob};
use price_tracker::symbols::SymbolCache;
use price_tracker::{
    create_router, AppConfig, AppState, Cache, FinnhubClient, QuoteFetcher, StockService,
    SymbolService, TrackingScheduler,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "price_tracker=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Repositories: PostgreSQL when DATABASE_URL is set, in-memory otherwise
    let (symbol_repository, price_repository) = initialize_database(&config);

    // Cache: Redis when REDIS_URL is set, in-memory otherwise
    let cache = initialize_cache(&config).await;
    let fetcher: Arc<dyn QuoteFetcher> = Arc::new(FinnhubClient::new(&config.finnhub)?);

    tracing::info!("📡 Finnhub client configured for {}", config.finnhub.base_url);

    let symbol_service = SymbolService::new(
        symbol_repository.clone(),
        fetcher.clone(),
        SymbolCache::new(cache.clone()),
        config.tracking.check_interval_ms,
    );

    let scheduler = Arc::new(TrackingScheduler::new(
        symbol_service.clone(),
        fetcher.clone(),
        price_repository.clone(),
    ));

    match scheduler.resume_active().await {
        Ok(count) => tracing::info!("⏰ Resumed {} tracking jobs", count),
        Err(e) => tracing::error!("❌ Failed to resume tracking jobs: {}", e),
    }

    let retention_job = (config.tracking.retention_days > 0).then(|| {
        RetentionJob::new(
            symbol_repository.clone(),
            price_repository.clone(),
            config.tracking.retention_days,
        )
    });
    initialize_cron_scheduler(
        CachePurgeJob::new(cache.clone()),
        retention_job,
        config.tracking.retention_days,
    )
    .await;

    let stock_service = StockService::new(
        scheduler.clone(),
        symbol_service,
        price_repository,
        cache.clone(),
        Duration::from_secs(config.tracking.summary_ttl_secs),
    );

    let app = create_router(AppState {
        stock_service,
        cache,
        fetcher,
    });

    // Define the address
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 Price Tracker API server running on http://{}", addr);
    tracing::info!("📊 Health check: http://{}/api/v1/health", addr);
    tracing::info!("📚 Swagger UI: http://{}/swagger-ui", addr);

    // Start the server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stopped = scheduler.stop_all().await;
    tracing::info!("👋 Shutdown complete ({} tracking jobs stopped)", stopped);

    Ok(())
}

/// Initialize the database connection pool and repositories
///
/// Falls back to in-memory repositories when DATABASE_URL is unset or the
/// database is unreachable
fn initialize_database(
    config: &AppConfig,
) -> (Arc<dyn SymbolRepository>, Arc<dyn PriceRepository>) {
    use price_tracker::database::establish_connection_pool;

    let in_memory = || -> (Arc<dyn SymbolRepository>, Arc<dyn PriceRepository>) {
        (
            Arc::new(InMemorySymbolRepository::new()),
            Arc::new(InMemoryPriceRepository::new()),
        )
    };

    let Some(database_url) = config.database_url.as_deref() else {
        tracing::info!("🗄️  DATABASE_URL not set, using in-memory storage");
        return in_memory();
    };

    tracing::info!("🗄️  Initializing PostgreSQL connection...");

    let pool = match establish_connection_pool(database_url, config.db_pool_max_size) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Failed to establish database connection: {}", e);
            tracing::warn!("⚠️  Falling back to in-memory storage");
            return in_memory();
        }
    };

    match pool.run_migrations() {
        Ok(applied) => tracing::info!("✅ Database ready ({} migrations applied)", applied),
        Err(e) => {
            tracing::error!("❌ Failed to run migrations: {}", e);
            tracing::warn!("⚠️  Falling back to in-memory storage");
            return in_memory();
        }
    }

    let pool_clone = pool.clone();
    let symbol_repository =
        Arc::new(SymbolRepositoryImpl::new(move || pool_clone.get_conn())) as Arc<dyn SymbolRepository>;

    let price_repository =
        Arc::new(PriceRepositoryImpl::new(move || pool.get_conn())) as Arc<dyn PriceRepository>;

    (symbol_repository, price_repository)
}

/// Initialize the cache store
///
/// Falls back to the in-memory store when REDIS_URL is unset or Redis is
/// unreachable
async fn initialize_cache(config: &AppConfig) -> Cache {
    let Some(redis_url) = config.redis_url.as_deref() else {
        tracing::info!("🧠 REDIS_URL not set, using in-memory cache");
        return Cache::in_memory();
    };

    tracing::info!("🧠 Connecting to Redis...");

    let store: Arc<dyn CacheStore> = match RedisCacheStore::connect(redis_url).await {
        Ok(store) => {
            tracing::info!("✅ Redis cache ready");
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!("❌ Failed to connect to Redis: {}", e);
            tracing::warn!("⚠️  Falling back to in-memory cache");
            Arc::new(MemoryCacheStore::new())
        }
    };

    Cache::new(store)
}

/// Initialize cron scheduler for periodic jobs
async fn initialize_cron_scheduler(
    cache_purge_job: CachePurgeJob,
    retention_job: Option<RetentionJob>,
    retention_days: i64,
) {
    use tokio_cron_scheduler::JobScheduler;

    tracing::info!("⏰ Initializing cron scheduler...");

    let scheduler = match JobScheduler::new().await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!("❌ Failed to create cron scheduler: {}", e);
            return;
        }
    };

    if let Err(e) = cache_purge_job.register(&scheduler).await {
        tracing::error!("❌ Failed to register cache purge job: {}", e);
        return;
    }

    if let Some(retention_job) = retention_job {
        if let Err(e) = retention_job.register(&scheduler).await {
            tracing::error!("❌ Failed to register price retention job: {}", e);
            return;
        }
    }

    if let Err(e) = scheduler.start().await {
        tracing::error!("❌ Failed to start cron scheduler: {}", e);
        return;
    }

    tracing::info!("✅ Cron scheduler started successfully");
    tracing::info!("   • Cache purge: Every minute");
    if retention_days > 0 {
        tracing::info!("   • Price retention: Every hour, keeping {} days", retention_days);
    }

    // Keep scheduler alive (it will run in the background)
    std::mem::forget(scheduler);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received");
}

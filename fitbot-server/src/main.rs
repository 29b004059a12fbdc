mod error;
mod routes;
mod state;

use std::env;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;

use fitbot_core::TurnEngine;
use fitbot_database::{CacheService, Database, database::DEFAULT_CACHE_PREFIX};
use fitbot_llm::{LlmService, prompt::coach_persona};

use crate::state::AppState;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load the .env file before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    let database_url = env::var("DATABASE_URL")?;
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let max_connections = u32::try_from(env_u64("DATABASE_MAX_CONNECTIONS", 5)).unwrap_or(5);

    let db_pool = Database::connect_pool(&database_url, max_connections).await?;
    info!(max_connections, "PostgreSQL connection established.");

    let cache = cache_from_env();
    if cache.is_redis_enabled() {
        match cache.ping().await {
            Ok(()) => info!("Redis cache health check passed."),
            Err(err) => warn!(
                ?err,
                "Redis cache ping failed; profile reads will fall back to PostgreSQL."
            ),
        }
    }
    let db = Database::with_cache(db_pool, cache);

    if env_bool("AUTO_RUN_MIGRATIONS", true) {
        db.run_migrations().await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let llm = LlmService::from_env()?;
    info!(
        provider = llm.provider_name(),
        model = llm.model(),
        timeout_seconds = llm.timeout().as_secs(),
        "LLM integration configured."
    );

    let db = Arc::new(db);
    let engine = TurnEngine::new(db.clone(), db.clone(), Arc::new(llm)).with_persona(coach_persona());
    let app = routes::router(AppState {
        engine,
        profiles: db.clone(),
        workouts: db,
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "FitBot is listening.");

    axum::serve(listener, app).await?;
    Ok(())
}

fn cache_from_env() -> CacheService {
    let redis_key_prefix =
        env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| DEFAULT_CACHE_PREFIX.to_string());

    if !env_bool("REDIS_ENABLED", false) {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(redis_key_prefix);
    }

    let Ok(redis_url) = env::var("REDIS_URL") else {
        warn!(key_prefix = %redis_key_prefix, "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode.");
        return CacheService::disabled(redis_key_prefix);
    };

    match CacheService::redis(&redis_url, redis_key_prefix.clone()) {
        Ok(cache) => {
            info!(key_prefix = %redis_key_prefix, "Redis cache enabled.");
            cache
        }
        Err(err) => {
            warn!(?err, key_prefix = %redis_key_prefix, "Failed to initialize Redis cache; continuing with DB-only mode.");
            CacheService::disabled(redis_key_prefix)
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(value) => value.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

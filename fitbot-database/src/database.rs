use anyhow::Context as _;
use sqlx::{PgPool, migrate::Migrator, postgres::PgPoolOptions};

use crate::cache::CacheService;

/// Schema for profiles and the workout, nutrition and goal logs.
pub static MIGRATOR: Migrator = sqlx::migrate!();

pub const DEFAULT_CACHE_PREFIX: &str = "fitbot:prod";

/// Pool plus profile cache; cloned into every request handler.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
    cache: CacheService,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: CacheService::disabled(DEFAULT_CACHE_PREFIX),
        }
    }

    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self { pool, cache }
    }

    /// Open a PostgreSQL pool for `database_url`.
    pub async fn connect_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .context("failed to connect to PostgreSQL")
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("failed to apply database migrations")
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }
}

mod redis_store;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use redis_store::RedisCacheStore;

/// How long a cached profile snapshot stays valid.
pub const PROFILE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Profile snapshots, optionally mirrored in Redis. Every operation on a
/// disabled cache is a miss or a no-op.
#[derive(Clone, Debug)]
pub struct CacheService {
    key_prefix: String,
    redis: Option<RedisCacheStore>,
}

impl CacheService {
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: prefix.into(),
            redis: None,
        }
    }

    pub fn redis(redis_url: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            key_prefix: prefix.into(),
            redis: Some(RedisCacheStore::from_url(redis_url)?),
        })
    }

    pub fn is_redis_enabled(&self) -> bool {
        self.redis.is_some()
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        match &self.redis {
            Some(store) => store.ping().await,
            None => Ok(()),
        }
    }

    pub fn key(&self, suffix: impl AsRef<str>) -> String {
        format!("{}:{}", self.key_prefix, suffix.as_ref())
    }

    pub async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(store) = &self.redis else {
            return Ok(None);
        };

        match store.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                anyhow::anyhow!("failed to deserialize cache value for `{key}`: {e}")
            }),
            None => Ok(None),
        }
    }

    pub async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let Some(store) = &self.redis else {
            return Ok(());
        };

        let payload = serde_json::to_vec(value)
            .map_err(|e| anyhow::anyhow!("failed to serialize cache value for `{key}`: {e}"))?;
        store.set(key, payload, ttl.as_secs().max(1)).await
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        match &self.redis {
            Some(store) => store.del(key).await,
            None => Ok(()),
        }
    }

    /// Serve from cache when possible; cache failures degrade to the loader.
    pub async fn get_or_load_json<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(?e, cache_key = key, "cache get failed; falling back to database"),
        }

        let loaded = loader().await?;

        if let Err(e) = self.set_json(key, &loaded, ttl).await {
            warn!(?e, cache_key = key, "cache set failed; returning database value");
        }

        Ok(loaded)
    }
}

pub fn profile_key(cache: &CacheService, user_id: &str) -> String {
    cache.key(format!("profile:{user_id}"))
}

pub async fn invalidate_profile(cache: &CacheService, user_id: &str) -> anyhow::Result<()> {
    cache.del(&profile_key(cache, user_id)).await
}

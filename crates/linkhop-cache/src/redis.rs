use async_trait::async_trait;
use linkhop_core::{CacheError, Clock, LinkCache, ShortCode, ShortLink, SystemClock};
use redis::AsyncCommands;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::envelope;
use crate::Result;

/// A Redis-based implementation of [`LinkCache`].
///
/// All records live as fields of a single hash, keyed by short code. Redis
/// never expires the fields itself; the expiry inside each payload decides
/// whether a hit is served.
#[derive(Clone)]
pub struct RedisLinkCache {
    conn: redis::aio::MultiplexedConnection,
    hash_key: String,
    clock: Arc<dyn Clock>,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() || message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else if err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisLinkCache {
    /// Creates a new Redis link cache using the default hash key.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_hash_key(conn, "linkhop:shortcode:")
    }

    /// Creates a new Redis link cache storing records under `hash_key`.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    /// * `hash_key` - Name of the hash holding the records (e.g., "myapp:links")
    pub fn with_hash_key(
        conn: redis::aio::MultiplexedConnection,
        hash_key: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            hash_key: hash_key.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used to decide whether a hit has expired.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }
}

#[async_trait]
impl LinkCache for RedisLinkCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        trace!(code = %code, "Fetching link from Redis cache");

        let mut conn = self.conn.clone();
        let cached = match conn
            .hget::<_, _, Option<String>>(&self.hash_key, code.as_str())
            .await
        {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                trace!(code = %code, "Cache miss in Redis");
                return Ok(None);
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Redis error on get");
                return Err(map_redis_error("failed to fetch value from Redis", e));
            }
        };

        let record = envelope::decode(&cached).inspect_err(|e| {
            warn!(code = %code, error = %e, "Failed to deserialize cached record");
        })?;

        if !envelope::is_live(&record, self.clock.now()) {
            debug!(code = %code, expire_at = %record.expire_at, "Expired entry in Redis, treating as miss");
            let mut conn = self.conn.clone();
            let hash_key = self.hash_key.clone();
            let field = code.as_str().to_string();
            envelope::spawn_eviction(code.clone(), async move {
                conn.hdel::<_, _, ()>(&hash_key, &field)
                    .await
                    .map_err(|e| map_redis_error("failed to evict value from Redis", e))
            });
            return Ok(None);
        }

        debug!(code = %code, "Cache hit in Redis");
        Ok(Some(record))
    }

    async fn put(&self, record: &ShortLink) -> Result<()> {
        trace!(code = %record.code, "Storing link in Redis cache");

        let payload = envelope::encode(record).inspect_err(|e| {
            warn!(code = %record.code, error = %e, "Failed to serialize record for caching");
        })?;

        let mut conn = self.conn.clone();
        match conn
            .hset::<_, _, _, ()>(&self.hash_key, record.code.as_str(), payload)
            .await
        {
            Ok(()) => {
                debug!(code = %record.code, "Cached link in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(code = %record.code, error = %e, "Failed to cache link in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.hexists::<_, _, bool>(&self.hash_key, code.as_str())
            .await
            .map_err(|e| {
                warn!(code = %code, error = %e, "Redis error on exists");
                map_redis_error("failed to check key in Redis", e)
            })
    }

    async fn remove(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Removing link from Redis cache");

        let mut conn = self.conn.clone();
        match conn.hdel::<_, _, ()>(&self.hash_key, code.as_str()).await {
            Ok(()) => {
                debug!(code = %code, "Removed link from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Failed to remove link from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }
}

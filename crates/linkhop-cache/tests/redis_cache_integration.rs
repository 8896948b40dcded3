use std::sync::Arc;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use linkhop_cache::{CacheError, LinkCache, RedisLinkCache};
use linkhop_core::{LinkId, ManualClock, NewLink, ShortCode, ShortLink};
use linkhop_test_infra::redis::RedisServer;
use redis::AsyncCommands;

/// Test fixture that manages a Redis container using test-infra.
struct Fixture {
    _redis: RedisServer,
    conn: redis::aio::MultiplexedConnection,
    clock: ManualClock,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisServer::new().await.expect("start redis");
        let conn = redis.connection().await.expect("redis connection");

        Self {
            _redis: redis,
            conn,
            clock: ManualClock::new(start()),
        }
    }

    fn cache(&self) -> RedisLinkCache {
        RedisLinkCache::new(self.conn.clone()).with_clock(Arc::new(self.clock.clone()))
    }
}

fn start() -> Timestamp {
    "2026-01-01T00:00:00Z".parse().unwrap()
}

fn link(code: &str, url: &str) -> ShortLink {
    NewLink {
        code: ShortCode::new_unchecked(code),
        original_url: url.to_string(),
        expire_at: start() + SignedDuration::from_hours(1),
        is_custom: false,
        created_at: start(),
    }
    .into_link(LinkId(7))
}

#[tokio::test]
async fn test_redis_cache_put_then_get() {
    let fixture = Fixture::start().await;
    let cache = fixture.cache();
    let record = link("test123", "https://example.com");

    assert!(cache.get(&record.code).await.unwrap().is_none());

    cache.put(&record).await.unwrap();

    assert_eq!(cache.get(&record.code).await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_redis_cache_stores_fields_in_one_hash() {
    let fixture = Fixture::start().await;
    let cache = fixture.cache();

    cache.put(&link("alpha01", "https://a.example")).await.unwrap();
    cache.put(&link("beta002", "https://b.example")).await.unwrap();

    let mut conn = fixture.conn.clone();
    let len: usize = conn.hlen(cache.hash_key()).await.unwrap();
    assert_eq!(len, 2);
}

#[tokio::test]
async fn test_redis_cache_exists_and_remove() {
    let fixture = Fixture::start().await;
    let cache = fixture.cache();
    let record = link("remove1", "https://example.com");

    assert!(!cache.exists(&record.code).await.unwrap());
    cache.put(&record).await.unwrap();
    assert!(cache.exists(&record.code).await.unwrap());

    cache.remove(&record.code).await.unwrap();
    assert!(!cache.exists(&record.code).await.unwrap());

    // Removing an absent field is not an error.
    cache.remove(&record.code).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redis_cache_expired_hit_is_evicted() {
    let fixture = Fixture::start().await;
    let cache = fixture.cache();
    let record = link("expire1", "https://example.com");
    cache.put(&record).await.unwrap();

    fixture.clock.advance(SignedDuration::from_mins(61));

    assert!(cache.get(&record.code).await.unwrap().is_none());

    awaitility::at_most(Duration::from_secs(5))
        .poll_interval(Duration::from_millis(50))
        .until_async(|| async { !cache.exists(&record.code).await.unwrap() })
        .await;
}

#[tokio::test]
async fn test_redis_cache_rejects_corrupt_payload() {
    let fixture = Fixture::start().await;
    let cache = fixture.cache();

    let mut conn = fixture.conn.clone();
    let _: () = conn
        .hset(cache.hash_key(), "corrupt", "not-json")
        .await
        .unwrap();

    let err = cache
        .get(&ShortCode::new_unchecked("corrupt"))
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::InvalidData(_)));
}

#[tokio::test]
async fn test_redis_cache_custom_hash_key_isolated() {
    let fixture = Fixture::start().await;
    let a = RedisLinkCache::with_hash_key(fixture.conn.clone(), "tenant-a:links");
    let b = RedisLinkCache::with_hash_key(fixture.conn.clone(), "tenant-b:links");
    let record = NewLink {
        code: ShortCode::new_unchecked("shared1"),
        original_url: "https://example.com".to_string(),
        expire_at: Timestamp::now() + SignedDuration::from_hours(1),
        is_custom: true,
        created_at: Timestamp::now(),
    }
    .into_link(LinkId(1));

    a.put(&record).await.unwrap();

    assert!(a.get(&record.code).await.unwrap().is_some());
    assert!(b.get(&record.code).await.unwrap().is_none());
}

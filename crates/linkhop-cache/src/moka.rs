use crate::envelope;
use crate::Result;
use ::moka::future::Cache;
use ::moka::Expiry;
use async_trait::async_trait;
use jiff::Timestamp;
use linkhop_core::{Clock, LinkCache, ShortCode, ShortLink, SystemClock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

/// A cached payload together with the expiry decoded at insert time.
#[derive(Debug, Clone)]
struct CachedEntry {
    payload: Arc<str>,
    expire_at: Timestamp,
}

/// Slack added to moka's native expiry. A record is still live at the exact
/// instant of `expire_at`, so moka must not drop it before that instant has
/// passed.
const NATIVE_EXPIRY_GRACE: Duration = Duration::from_secs(1);

/// Derives moka's native per-entry expiry from the record's own expiry.
///
/// This only lets moka reclaim memory for dead links; the authoritative
/// check is the payload comparison in [`MokaLinkCache::get`].
struct PayloadExpiry {
    clock: Arc<dyn Clock>,
}

impl PayloadExpiry {
    fn remaining(&self, entry: &CachedEntry) -> Duration {
        let left = entry.expire_at.duration_since(self.clock.now());
        Duration::try_from(left)
            .unwrap_or(Duration::ZERO)
            .saturating_add(NATIVE_EXPIRY_GRACE)
    }
}

impl Expiry<String, CachedEntry> for PayloadExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.remaining(value))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(self.remaining(value))
    }
}

/// Configuration for creating a [`MokaLinkCache`].
#[derive(TypedBuilder)]
pub struct MokaCacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default = 100_000)]
    max_capacity: u64,
    /// Clock used for payload expiry checks.
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
}

/// An in-memory [`LinkCache`] backed by Moka.
///
/// Entries are stored in their encoded form, exactly as they would be in
/// Redis, so both backends share one serialization path.
#[derive(Clone)]
pub struct MokaLinkCache {
    cache: Cache<String, CachedEntry>,
    clock: Arc<dyn Clock>,
}

impl MokaLinkCache {
    /// Creates a cache with default settings and the system clock.
    pub fn new() -> Self {
        Self::from_config(MokaCacheConfig::builder().build())
    }

    /// Creates a cache holding at most `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::from_config(MokaCacheConfig::builder().max_capacity(max_capacity).build())
    }

    pub fn from_config(config: MokaCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PayloadExpiry {
                clock: Arc::clone(&config.clock),
            })
            .build();

        Self {
            cache,
            clock: config.clock,
        }
    }

    /// Returns a builder for creating a custom cache configuration.
    pub fn builder() -> MokaCacheConfigBuilder {
        MokaCacheConfig::builder()
    }
}

impl Default for MokaLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for MokaLinkCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        trace!(code = %code, "Fetching link from Moka cache");

        let Some(entry) = self.cache.get(code.as_str()).await else {
            trace!(code = %code, "Cache miss in Moka");
            return Ok(None);
        };

        let record = envelope::decode(&entry.payload)?;
        if !envelope::is_live(&record, self.clock.now()) {
            debug!(code = %code, expire_at = %record.expire_at, "Expired entry in Moka, treating as miss");
            let cache = self.cache.clone();
            let key = code.as_str().to_string();
            envelope::spawn_eviction(code.clone(), async move {
                cache.invalidate(&key).await;
                Ok(())
            });
            return Ok(None);
        }

        debug!(code = %code, "Cache hit in Moka");
        Ok(Some(record))
    }

    async fn put(&self, record: &ShortLink) -> Result<()> {
        trace!(code = %record.code, "Storing link in Moka cache");

        let entry = CachedEntry {
            payload: Arc::from(envelope::encode(record)?),
            expire_at: record.expire_at,
        };
        self.cache
            .insert(record.code.as_str().to_string(), entry)
            .await;

        debug!(code = %record.code, "Cached link in Moka");
        Ok(())
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.cache.contains_key(code.as_str()))
    }

    async fn remove(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Removing link from Moka cache");

        self.cache.invalidate(code.as_str()).await;
        debug!(code = %code, "Removed link from Moka cache (if present)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use linkhop_core::{LinkId, ManualClock, NewLink};

    fn start() -> Timestamp {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    fn link(code: &str, url: &str, expire_at: Timestamp) -> ShortLink {
        NewLink {
            code: ShortCode::new_unchecked(code),
            original_url: url.to_string(),
            expire_at,
            is_custom: false,
            created_at: start(),
        }
        .into_link(LinkId(1))
    }

    fn manual_cache(clock: &ManualClock) -> MokaLinkCache {
        MokaLinkCache::from_config(
            MokaLinkCache::builder()
                .max_capacity(100)
                .clock(Arc::new(clock.clone()))
                .build(),
        )
    }

    #[tokio::test]
    async fn cache_get_and_put() {
        let clock = ManualClock::new(start());
        let cache = manual_cache(&clock);
        let record = link("abc123", "https://example.com", start() + SignedDuration::from_hours(1));

        // Initially empty
        assert!(cache.get(&record.code).await.unwrap().is_none());

        cache.put(&record).await.unwrap();

        assert_eq!(cache.get(&record.code).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() {
        let clock = ManualClock::new(start());
        let cache = manual_cache(&clock);
        let expire_at = start() + SignedDuration::from_hours(1);

        cache.put(&link("abc123", "https://old.example", expire_at)).await.unwrap();
        cache.put(&link("abc123", "https://new.example", expire_at)).await.unwrap();

        let got = cache.get(&ShortCode::new_unchecked("abc123")).await.unwrap().unwrap();
        assert_eq!(got.original_url, "https://new.example");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn expired_hit_is_a_miss_and_gets_evicted() {
        let clock = ManualClock::new(start());
        let cache = manual_cache(&clock);
        let record = link("abc123", "https://example.com", start() + SignedDuration::from_hours(1));
        cache.put(&record).await.unwrap();

        clock.advance(SignedDuration::from_mins(61));

        assert!(cache.get(&record.code).await.unwrap().is_none());

        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(10))
            .until_async(|| async { !cache.exists(&record.code).await.unwrap() })
            .await;
    }

    #[tokio::test]
    async fn entry_is_served_at_the_exact_expiry_instant() {
        let clock = ManualClock::new(start());
        let cache = manual_cache(&clock);
        let expire_at = start() + SignedDuration::from_mins(5);
        let record = link("edge01", "https://example.com/edge", expire_at);

        clock.set(expire_at);
        cache.put(&record).await.unwrap();

        assert_eq!(cache.get(&record.code).await.unwrap(), Some(record));
    }

    #[test]
    fn native_expiry_outlives_payload_expiry() {
        let clock = ManualClock::new(start());
        let expiry = PayloadExpiry {
            clock: Arc::new(clock.clone()),
        };
        let entry = CachedEntry {
            payload: Arc::from("{}"),
            expire_at: start(),
        };

        assert!(expiry.remaining(&entry) > Duration::ZERO);

        clock.advance(SignedDuration::from_mins(1));
        assert_eq!(expiry.remaining(&entry), NATIVE_EXPIRY_GRACE);
    }

    #[tokio::test]
    async fn exists_reports_presence() {
        let clock = ManualClock::new(start());
        let cache = manual_cache(&clock);
        let record = link("abc123", "https://example.com", start() + SignedDuration::from_hours(1));

        assert!(!cache.exists(&record.code).await.unwrap());
        cache.put(&record).await.unwrap();
        assert!(cache.exists(&record.code).await.unwrap());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let cache = MokaLinkCache::with_capacity(10);
        let code = ShortCode::new_unchecked("abc123");

        cache.remove(&code).await.unwrap();
        cache.remove(&code).await.unwrap();
        assert!(cache.get(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_deletes_entry() {
        let cache = MokaLinkCache::new();
        let record = link(
            "abc123",
            "https://example.com",
            Timestamp::now() + SignedDuration::from_hours(1),
        );

        cache.put(&record).await.unwrap();
        cache.remove(&record.code).await.unwrap();

        assert!(cache.get(&record.code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn handles_many_entries() {
        let clock = ManualClock::new(start());
        let cache = manual_cache(&clock);
        let expire_at = start() + SignedDuration::from_hours(1);

        for i in 0..50 {
            let record = link(&format!("code{i:04}"), &format!("https://example{i}"), expire_at);
            cache.put(&record).await.unwrap();
        }

        let got = cache.get(&ShortCode::new_unchecked("code0025")).await.unwrap().unwrap();
        assert_eq!(got.original_url, "https://example25");
    }
}

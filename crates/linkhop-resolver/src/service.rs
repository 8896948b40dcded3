use crate::config::ResolverConfig;
use crate::error::{ResolutionError, Result};
use jiff::SignedDuration;
use linkhop_core::{Clock, LinkCache, NewLink, ShortCode, ShortLink, SystemClock, UrlStore};
use linkhop_generator::CodeGenerator;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Request to create a short link.
#[derive(Debug, Clone)]
pub struct CreateLink {
    /// The original URL to be shortened.
    pub original_url: String,
    /// Caller-chosen code; a random one is generated when `None`.
    pub custom_code: Option<ShortCode>,
    /// Lifetime of the link. Falls back to [`ResolverConfig::default_ttl`].
    pub ttl: Option<SignedDuration>,
}

impl CreateLink {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            custom_code: None,
            ttl: None,
        }
    }

    pub fn with_code(mut self, code: ShortCode) -> Self {
        self.custom_code = Some(code);
        self
    }

    pub fn with_ttl(mut self, ttl: SignedDuration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Allocates short codes and resolves them cache-aside.
///
/// The store is the source of truth. The cache is consulted first on reads
/// and refilled on detached tasks, so neither path waits on a cache write.
#[derive(Clone)]
pub struct ResolutionService {
    store: Arc<dyn UrlStore>,
    cache: Arc<dyn LinkCache>,
    generator: Arc<dyn CodeGenerator>,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
}

impl ResolutionService {
    pub fn new(
        store: Arc<dyn UrlStore>,
        cache: Arc<dyn LinkCache>,
        generator: Arc<dyn CodeGenerator>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            cache,
            generator,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replaces the clock used for expiry checks and creation timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Picks a code that is free in both the cache and the store.
    ///
    /// A backend error during the checks fails the allocation; it is never
    /// read as "available".
    pub async fn allocate_code(&self, custom: Option<ShortCode>) -> Result<ShortCode> {
        match custom {
            Some(code) => self.claim_custom(code).await,
            None => self.generate_unique().await,
        }
    }

    async fn claim_custom(&self, code: ShortCode) -> Result<ShortCode> {
        trace!(code = %code, "Checking custom short code");

        let cached = self.cache.exists(&code).await.map_err(|e| {
            warn!(code = %code, error = %e, "Cache check failed during allocation");
            ResolutionError::AllocationCheckFailed(format!("cache: {e}"))
        })?;
        if cached {
            debug!(code = %code, "Custom short code taken (cache)");
            return Err(ResolutionError::CodeAlreadyInUse(code.to_string()));
        }

        let stored = self.store.exists(&code).await.map_err(|e| {
            warn!(code = %code, error = %e, "Store check failed during allocation");
            ResolutionError::AllocationCheckFailed(format!("store: {e}"))
        })?;
        if stored {
            debug!(code = %code, "Custom short code taken (store)");
            return Err(ResolutionError::CodeAlreadyInUse(code.to_string()));
        }

        Ok(code)
    }

    async fn generate_unique(&self) -> Result<ShortCode> {
        let attempts = self.config.max_attempts;

        for attempt in 1..=attempts {
            let candidate = self.generator.generate(self.config.code_length)?;

            let stored = self.store.exists(&candidate).await.map_err(|e| {
                warn!(code = %candidate, error = %e, "Store check failed during allocation");
                ResolutionError::AllocationCheckFailed(format!("store: {e}"))
            })?;
            if stored {
                debug!(code = %candidate, attempt, "Generated code collides with store");
                continue;
            }

            let cached = self.cache.exists(&candidate).await.map_err(|e| {
                warn!(code = %candidate, error = %e, "Cache check failed during allocation");
                ResolutionError::AllocationCheckFailed(format!("cache: {e}"))
            })?;
            if cached {
                debug!(code = %candidate, attempt, "Generated code collides with cache");
                continue;
            }

            trace!(code = %candidate, attempt, "Allocated generated code");
            return Ok(candidate);
        }

        warn!(attempts, "Exhausted short code allocation attempts");
        Err(ResolutionError::CodeSpaceExhausted { attempts })
    }

    /// Resolves a code to a live link.
    ///
    /// Cache hits return without touching the store. On a miss the store
    /// answers and the cache is refilled in the background.
    pub async fn resolve(&self, code: &ShortCode) -> Result<ShortLink> {
        trace!(code = %code, "Resolving short code");

        match self.cache.get(code).await {
            Ok(Some(link)) if !link.is_expired_at(self.clock.now()) => {
                debug!(code = %code, "Resolved from cache");
                return Ok(link);
            }
            Ok(Some(_)) => {
                debug!(code = %code, "Cached link expired, falling back to store");
            }
            Ok(None) => {
                trace!(code = %code, "Cache miss");
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Cache error on resolve, treating as miss");
            }
        }

        let link = self
            .store
            .get_by_code(code)
            .await
            .map_err(|e| {
                warn!(code = %code, error = %e, "Store error on resolve");
                ResolutionError::StoreUnavailable(e)
            })?
            .ok_or_else(|| {
                trace!(code = %code, "Short code not found");
                ResolutionError::CodeNotFound(code.to_string())
            })?;

        if link.is_expired_at(self.clock.now()) {
            debug!(code = %code, expire_at = %link.expire_at, "Link has expired");
            return Err(ResolutionError::LinkExpired(code.to_string()));
        }

        self.spawn_cache_fill(link.clone());
        debug!(code = %code, "Resolved from store");
        Ok(link)
    }

    /// Allocates a code, persists the link and warms the cache.
    pub async fn create(&self, request: CreateLink) -> Result<ShortLink> {
        let link = self.persist(request).await?;
        self.spawn_cache_fill(link.clone());
        Ok(link)
    }

    /// Like [`create`](Self::create), but waits for the cache write before
    /// returning. Short-lived processes use this so the runtime is not torn
    /// down under a pending fill.
    pub async fn create_and_warm(&self, request: CreateLink) -> Result<ShortLink> {
        let link = self.persist(request).await?;
        fill_cache(self.cache.as_ref(), &link).await;
        Ok(link)
    }

    async fn persist(&self, request: CreateLink) -> Result<ShortLink> {
        let ttl = request.ttl.unwrap_or(self.config.default_ttl);
        if ttl <= SignedDuration::ZERO {
            return Err(ResolutionError::InvalidTtl(format!(
                "ttl must be positive, got {ttl}"
            )));
        }

        let is_custom = request.custom_code.is_some();
        let code = self.allocate_code(request.custom_code).await?;

        let now = self.clock.now();
        let expire_at = now
            .checked_add(ttl)
            .map_err(|e| ResolutionError::InvalidTtl(e.to_string()))?;

        let link = self
            .store
            .insert(NewLink {
                code,
                original_url: request.original_url,
                expire_at,
                is_custom,
                created_at: now,
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist new link");
                ResolutionError::from(e)
            })?;

        info!(code = %link.code, id = %link.id, is_custom, expire_at = %link.expire_at, "Created short link");
        Ok(link)
    }

    fn spawn_cache_fill(&self, link: ShortLink) {
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move { fill_cache(cache.as_ref(), &link).await });
    }
}

async fn fill_cache(cache: &dyn LinkCache, link: &ShortLink) {
    match cache.put(link).await {
        Ok(()) => trace!(code = %link.code, "Cache populated"),
        Err(e) => warn!(code = %link.code, error = %e, "Failed to populate cache"),
    }
}

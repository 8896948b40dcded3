use crate::error::CacheError;
use crate::link::ShortLink;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, CacheError>;

/// A cache for short link records keyed by [`ShortCode`].
///
/// The cache accelerates lookups and is never the source of truth. Records
/// carry their own expiry; implementations must treat an expired entry as a
/// miss.
#[async_trait]
pub trait LinkCache: Send + Sync + 'static {
    /// Get a live record from the cache.
    ///
    /// Returns `Ok(None)` on a miss and on an expired hit. Expired entries
    /// are removed in the background.
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortLink>>;

    /// Store a record under its own code, overwriting any previous entry.
    async fn put(&self, record: &ShortLink) -> Result<()>;

    /// Check whether any entry (live or expired) is stored for the code.
    ///
    /// A backend failure is an `Err`, never `Ok(false)`.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Remove the entry for a code. Removing a missing entry is not an error.
    async fn remove(&self, code: &ShortCode) -> Result<()>;
}

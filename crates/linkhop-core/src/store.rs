use crate::error::StorageError;
use crate::link::{LinkId, NewLink, ShortLink};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::collections::HashMap;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Pending click increments per link, as handed to [`ClickStore::add_counts`].
pub type ClickCounts = HashMap<LinkId, u64>;

/// Durable mapping from short code to link record.
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Checks whether a short code is taken. Expired records still count.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Inserts a new record and returns it with its assigned id.
    ///
    /// Returns `Err(DuplicateKey)` if the code already exists. This check is
    /// independent of any earlier `exists` call.
    async fn insert(&self, link: NewLink) -> Result<ShortLink>;

    /// Retrieves the record for a code, including expired ones.
    /// Returns `None` if the code does not exist.
    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>>;
}

/// Durable sink for aggregated click counts.
#[async_trait]
pub trait ClickStore: Send + Sync + 'static {
    /// Adds every increment in `counts`, all or nothing.
    async fn add_counts(&self, counts: &ClickCounts) -> Result<()>;
}

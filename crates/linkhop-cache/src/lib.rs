//! [`LinkCache`] implementations shared across linkhop services.
//!
//! Both backends store the same JSON envelope (see [`envelope`]) so the
//! record's own expiry travels with the payload.

pub mod envelope;
pub mod moka;
pub mod redis;

pub use crate::moka::{MokaCacheConfig, MokaLinkCache};
pub use crate::redis::RedisLinkCache;
pub use linkhop_core::{CacheError, LinkCache};

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

//! Core types and traits for the linkhop URL shortener.
//!
//! This crate holds the record model, the short code type, and the
//! collaborator traits (cache, URL store, click store) shared by the
//! resolver, the click aggregator and the backend crates.

pub mod cache;
pub mod clock;
pub mod error;
pub mod link;
pub mod shortcode;
pub mod store;

pub use cache::LinkCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, CoreError, StorageError};
pub use link::{LinkId, NewLink, ShortLink};
pub use shortcode::ShortCode;
pub use store::{ClickCounts, ClickStore, UrlStore};

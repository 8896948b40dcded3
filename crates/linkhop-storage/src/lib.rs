//! Durable [`UrlStore`] and [`ClickStore`] implementations.

pub mod memory;
pub mod mysql;

pub use linkhop_core::store::{ClickCounts, ClickStore, Result, UrlStore};
pub use linkhop_core::StorageError;
pub use memory::InMemoryStore;
pub use mysql::MySqlStore;

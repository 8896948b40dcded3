use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use linkhop_core::store::{ClickCounts, ClickStore, Result, UrlStore};
use linkhop_core::{LinkId, NewLink, ShortCode, ShortLink, StorageError};
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory implementation of [`UrlStore`] and [`ClickStore`] using DashMap.
///
/// Rows are never removed, expired ones included, matching the durable
/// store. Ids are assigned sequentially starting at 1.
#[derive(Debug)]
pub struct InMemoryStore {
    links: DashMap<String, ShortLink>,
    codes_by_id: DashMap<LinkId, String>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            links: DashMap::with_capacity(capacity),
            codes_by_id: DashMap::with_capacity(capacity),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlStore for InMemoryStore {
    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.links.contains_key(code.as_str()))
    }

    async fn insert(&self, link: NewLink) -> Result<ShortLink> {
        // The entry guard holds the shard lock, so two racing inserts of the
        // same code cannot both see a vacant slot.
        match self.links.entry(link.code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateKey(link.code.to_string())),
            Entry::Vacant(slot) => {
                let id = LinkId(self.next_id.fetch_add(1, Ordering::Relaxed));
                let record = link.into_link(id);
                self.codes_by_id.insert(id, record.code.as_str().to_owned());
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        Ok(self.links.get(code.as_str()).map(|entry| entry.clone()))
    }
}

#[async_trait]
impl ClickStore for InMemoryStore {
    async fn add_counts(&self, counts: &ClickCounts) -> Result<()> {
        // Resolve every id before touching any row.
        let mut targets = Vec::with_capacity(counts.len());
        for (id, count) in counts {
            if *count == 0 {
                continue;
            }
            let Some(code) = self.codes_by_id.get(id) else {
                return Err(StorageError::InvalidData(format!("unknown link id {id}")));
            };
            targets.push((code.clone(), *count));
        }

        for (code, count) in targets {
            if let Some(mut link) = self.links.get_mut(&code) {
                link.clicks = link.clicks.saturating_add(count);
            }
        }

        Ok(())
    }
}

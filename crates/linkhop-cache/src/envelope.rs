//! Serialization and expiry helpers for cached link records.
//!
//! The expiry is carried inside the payload rather than relying on the
//! backend's native TTL, so the cache and the store agree on what "expired"
//! means.

use crate::Result;
use jiff::Timestamp;
use linkhop_core::{CacheError, ShortCode, ShortLink};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, warn};

const ENVELOPE_VERSION: u8 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u8,
    record: &'a ShortLink,
}

#[derive(Deserialize)]
struct Envelope {
    v: u8,
    record: ShortLink,
}

/// Encodes a record into the payload stored by every backend.
pub fn encode(record: &ShortLink) -> Result<String> {
    serde_json::to_string(&EnvelopeRef {
        v: ENVELOPE_VERSION,
        record,
    })
    .map_err(|e| CacheError::Serialization(format!("failed to serialize cache value: {e}")))
}

/// Decodes a payload written by [`encode`].
pub fn decode(payload: &str) -> Result<ShortLink> {
    let envelope: Envelope = serde_json::from_str(payload)
        .map_err(|e| CacheError::InvalidData(format!("invalid cached value: {e}")))?;

    if envelope.v != ENVELOPE_VERSION {
        return Err(CacheError::InvalidData(format!(
            "unsupported cache envelope version {}",
            envelope.v
        )));
    }

    Ok(envelope.record)
}

/// Returns `true` if a cached record may still be served at `now`.
pub fn is_live(record: &ShortLink, now: Timestamp) -> bool {
    !record.is_expired_at(now)
}

/// Removes a stale entry on a detached task.
///
/// The caller has already answered with a miss; failures are only logged.
pub(crate) fn spawn_eviction<F>(code: ShortCode, removal: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match removal.await {
            Ok(()) => debug!(code = %code, "Evicted expired cache entry"),
            Err(e) => warn!(code = %code, error = %e, "Failed to evict expired cache entry"),
        }
    });
}

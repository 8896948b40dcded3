use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Row identifier assigned by the URL store on insert.
///
/// Click events carry only this id; the aggregator never needs the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub i64);

impl Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored short link.
///
/// `expire_at` is fixed at creation. An expired link is kept by both the
/// cache and the store; callers decide with [`ShortLink::is_expired_at`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub id: LinkId,
    pub code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    pub expire_at: Timestamp,
    /// `true` when the caller chose the code, `false` when it was generated.
    pub is_custom: bool,
    /// Click count as of the last aggregator flush.
    pub clicks: u64,
    pub created_at: Timestamp,
}

impl ShortLink {
    /// Returns `true` once `now` is strictly past the expiry.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expire_at
    }
}

/// Insert payload for a new short link. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub code: ShortCode,
    pub original_url: String,
    pub expire_at: Timestamp,
    pub is_custom: bool,
    pub created_at: Timestamp,
}

impl NewLink {
    /// Builds the stored record once the store has assigned an id.
    pub fn into_link(self, id: LinkId) -> ShortLink {
        ShortLink {
            id,
            code: self.code,
            original_url: self.original_url,
            expire_at: self.expire_at,
            is_custom: self.is_custom,
            clicks: 0,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn link(expire_at: Timestamp) -> ShortLink {
        NewLink {
            code: ShortCode::new_unchecked("abc123"),
            original_url: "https://example.com".to_string(),
            expire_at,
            is_custom: false,
            created_at: Timestamp::UNIX_EPOCH,
        }
        .into_link(LinkId(7))
    }

    #[test]
    fn expiry_is_strict() {
        let expire_at = Timestamp::from_second(1_000).unwrap();
        let link = link(expire_at);

        assert!(!link.is_expired_at(expire_at - SignedDuration::from_secs(1)));
        assert!(!link.is_expired_at(expire_at));
        assert!(link.is_expired_at(expire_at + SignedDuration::from_secs(1)));
    }

    #[test]
    fn into_link_starts_with_zero_clicks() {
        let link = link(Timestamp::from_second(1_000).unwrap());
        assert_eq!(link.id, LinkId(7));
        assert_eq!(link.clicks, 0);
        assert!(!link.is_custom);
    }
}

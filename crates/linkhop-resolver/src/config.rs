use jiff::SignedDuration;
use typed_builder::TypedBuilder;

/// Configuration for [`ResolutionService`](crate::ResolutionService).
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResolverConfig {
    /// Length of generated short codes.
    #[builder(default = 6)]
    pub code_length: usize,
    /// Generated candidates tried before giving up on allocation.
    #[builder(default = 5)]
    pub max_attempts: u32,
    /// Lifetime of a link created without an explicit TTL.
    #[builder(default = SignedDuration::from_hours(1))]
    pub default_ttl: SignedDuration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

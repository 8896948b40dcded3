use crate::error::Result;
use crate::service::ResolutionService;
use linkhop_clicks::ClickRecorder;
use linkhop_core::ShortCode;
use tracing::{debug, trace};

/// The redirect path: resolve, count the click, hand back the target.
///
/// Click recording never waits; a full queue only costs the click.
#[derive(Clone)]
pub struct Redirector {
    resolver: ResolutionService,
    clicks: ClickRecorder,
}

impl Redirector {
    pub fn new(resolver: ResolutionService, clicks: ClickRecorder) -> Self {
        Self { resolver, clicks }
    }

    /// Returns the original URL for `code` and records one click for it.
    pub async fn redirect(&self, code: &ShortCode) -> Result<String> {
        let link = self.resolver.resolve(code).await?;

        if self.clicks.record(link.id) {
            trace!(code = %code, link_id = %link.id, "Recorded click");
        } else {
            debug!(code = %code, link_id = %link.id, "Click dropped");
        }

        Ok(link.original_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CreateLink, ResolutionError, ResolverConfig};
    use linkhop_cache::MokaLinkCache;
    use linkhop_clicks::{ClickAggregator, ClickAggregatorConfig};
    use linkhop_core::UrlStore;
    use linkhop_generator::RandomCodeGenerator;
    use linkhop_storage::InMemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn redirect_counts_clicks_once_flushed() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ResolutionService::new(
            store.clone(),
            Arc::new(MokaLinkCache::new()),
            Arc::new(RandomCodeGenerator::seeded(3)),
            ResolverConfig::default(),
        );
        let aggregator = ClickAggregator::spawn(store.clone(), ClickAggregatorConfig::default());
        let redirector = Redirector::new(resolver.clone(), aggregator.recorder());

        let link = resolver
            .create(CreateLink::new("https://example.com/landing"))
            .await
            .unwrap();

        for _ in 0..3 {
            let target = redirector.redirect(&link.code).await.unwrap();
            assert_eq!(target, "https://example.com/landing");
        }

        let stats = aggregator.drain().await;
        assert_eq!(stats.flushed_clicks, 3);

        let stored = store.get_by_code(&link.code).await.unwrap().unwrap();
        assert_eq!(stored.clicks, 3);
    }

    #[tokio::test]
    async fn failed_resolution_records_no_click() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ResolutionService::new(
            store.clone(),
            Arc::new(MokaLinkCache::new()),
            Arc::new(RandomCodeGenerator::seeded(3)),
            ResolverConfig::default(),
        );
        let aggregator = ClickAggregator::spawn(store, ClickAggregatorConfig::default());
        let redirector = Redirector::new(resolver, aggregator.recorder());

        let err = redirector
            .redirect(&ShortCode::new_unchecked("nope00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::CodeNotFound(_)));

        let stats = aggregator.drain().await;
        assert_eq!(stats.accepted, 0);
    }
}

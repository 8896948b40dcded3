use std::time::Duration;
use typed_builder::TypedBuilder;

/// Configuration for [`ClickAggregator`](crate::ClickAggregator).
#[derive(Debug, Clone, TypedBuilder)]
pub struct ClickAggregatorConfig {
    /// Number of click events the queue holds before new ones are dropped.
    #[builder(default = 10_000)]
    pub queue_capacity: usize,
    /// Time between two flushes of the aggregation window.
    #[builder(default = Duration::from_secs(5))]
    pub flush_interval: Duration,
}

impl Default for ClickAggregatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

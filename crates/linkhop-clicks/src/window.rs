use linkhop_core::{ClickCounts, LinkId};
use std::mem;

/// Click counts accumulated between two flushes.
///
/// Owned by the aggregator task alone, so it needs no locking.
#[derive(Debug, Default)]
pub struct AggregationWindow {
    counts: ClickCounts,
}

impl AggregationWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: LinkId) {
        *self.counts.entry(id).or_insert(0) += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct links in the window.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Total clicks across all links.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Hands out the accumulated counts and leaves an empty window behind.
    pub fn take(&mut self) -> ClickCounts {
        mem::take(&mut self.counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_per_link() {
        let mut window = AggregationWindow::new();
        for _ in 0..3 {
            window.record(LinkId(1));
        }
        window.record(LinkId(2));

        assert_eq!(window.len(), 2);
        assert_eq!(window.total(), 4);
    }

    #[test]
    fn take_leaves_empty_window() {
        let mut window = AggregationWindow::new();
        window.record(LinkId(7));
        window.record(LinkId(7));

        let counts = window.take();

        assert_eq!(counts.get(&LinkId(7)), Some(&2));
        assert!(window.is_empty());
        assert_eq!(window.total(), 0);
    }
}

//! Asynchronous click counting.
//!
//! Redirect handlers hand click events to a [`ClickRecorder`] without ever
//! blocking. A single [`ClickAggregator`] task folds them into an
//! [`AggregationWindow`] and periodically flushes the window to a
//! [`ClickStore`](linkhop_core::ClickStore).

pub mod aggregator;
pub mod config;
pub mod stats;
pub mod window;

pub use aggregator::{ClickAggregator, ClickRecorder};
pub use config::ClickAggregatorConfig;
pub use stats::{AggregatorState, ClickStats};
pub use window::AggregationWindow;

use crate::config::ClickAggregatorConfig;
use crate::stats::{AggregatorState, ClickStats, Shared};
use crate::window::AggregationWindow;
use linkhop_core::{ClickStore, LinkId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Cheap, cloneable handle for submitting click events.
#[derive(Debug, Clone)]
pub struct ClickRecorder {
    tx: mpsc::Sender<LinkId>,
    shared: Arc<Shared>,
}

impl ClickRecorder {
    /// Queues one click for `id`.
    ///
    /// Never waits. Returns `false` and counts a drop when the queue is full
    /// or the aggregator has shut down.
    pub fn record(&self, id: LinkId) -> bool {
        match self.tx.try_send(id) {
            Ok(()) => {
                self.shared.accepted();
                true
            }
            Err(TrySendError::Full(_)) => {
                self.shared.dropped();
                trace!(link_id = %id, "Click queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.shared.dropped();
                trace!(link_id = %id, "Click queue closed, dropping event");
                false
            }
        }
    }
}

/// Owns the background task that aggregates clicks and flushes them.
///
/// Dropping the aggregator without calling [`drain`](Self::drain) still
/// stops the worker, which flushes whatever was queued on its way out.
pub struct ClickAggregator {
    recorder: ClickRecorder,
    shared: Arc<Shared>,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl ClickAggregator {
    /// Starts the aggregator task on the current tokio runtime.
    pub fn spawn(store: Arc<dyn ClickStore>, config: ClickAggregatorConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown, shutdown_rx) = oneshot::channel();
        let shared = Arc::new(Shared::default());

        let worker = Worker {
            rx,
            shutdown: shutdown_rx,
            store,
            shared: Arc::clone(&shared),
            window: AggregationWindow::new(),
            flushes: JoinSet::new(),
        };
        let period = config.flush_interval.max(MIN_FLUSH_INTERVAL);
        let worker = tokio::spawn(worker.run(period));

        info!(
            queue_capacity = config.queue_capacity,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            "Click aggregator started"
        );

        Self {
            recorder: ClickRecorder {
                tx,
                shared: Arc::clone(&shared),
            },
            shared,
            shutdown,
            worker,
        }
    }

    pub fn recorder(&self) -> ClickRecorder {
        self.recorder.clone()
    }

    pub fn state(&self) -> AggregatorState {
        self.shared.state()
    }

    pub fn stats(&self) -> ClickStats {
        self.shared.snapshot()
    }

    /// Stops accepting clicks, flushes everything already queued and waits
    /// for all in-flight flushes to finish.
    pub async fn drain(self) -> ClickStats {
        let Self {
            shared,
            shutdown,
            worker,
            ..
        } = self;

        // The worker may already be gone if it panicked; the join below
        // reports that.
        let _ = shutdown.send(());

        if let Err(e) = worker.await {
            error!(error = %e, "Click aggregator task failed");
        }

        let stats = shared.snapshot();
        info!(
            accepted = stats.accepted,
            dropped = stats.dropped,
            flushed_clicks = stats.flushed_clicks,
            failed_batches = stats.failed_batches,
            "Click aggregator drained"
        );
        stats
    }
}

struct Worker {
    rx: mpsc::Receiver<LinkId>,
    shutdown: oneshot::Receiver<()>,
    store: Arc<dyn ClickStore>,
    shared: Arc<Shared>,
    window: AggregationWindow,
    flushes: JoinSet<()>,
}

impl Worker {
    async fn run(mut self, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut self.shutdown => break,
                _ = ticker.tick() => self.flush(),
                event = self.rx.recv() => match event {
                    Some(id) => self.accumulate(id),
                    None => break,
                },
            }

            self.reap_finished();
        }

        self.rx.close();
        while let Some(id) = self.rx.recv().await {
            self.accumulate(id);
        }
        self.flush();

        while let Some(joined) = self.flushes.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Click flush task failed");
            }
        }
        debug!("Click aggregator worker stopped");
    }

    fn accumulate(&mut self, id: LinkId) {
        self.window.record(id);
        self.shared.set_accumulating(true);
    }

    fn flush(&mut self) {
        if self.window.is_empty() {
            return;
        }

        let links = self.window.len();
        let clicks = self.window.total();
        let counts = self.window.take();
        self.shared.set_accumulating(false);
        self.shared.flush_started();

        let store = Arc::clone(&self.store);
        let shared = Arc::clone(&self.shared);
        self.flushes.spawn(async move {
            match store.add_counts(&counts).await {
                Ok(()) => {
                    shared.flush_succeeded(clicks);
                    debug!(links, clicks, "Flushed click batch");
                }
                Err(e) => {
                    shared.flush_failed();
                    warn!(links, clicks, error = %e, "Failed to flush click batch, dropping it");
                }
            }
        });
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.flushes.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "Click flush task failed");
            }
        }
    }
}

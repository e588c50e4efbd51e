//! Single-task event loop driving an [`InsertionQueue`].
//!
//! One task owns the queue and multiplexes four wake-up sources with
//! `tokio::select!`:
//!
//! - cancellation (host view torn down),
//! - the periodic due-scan, which reads the store and refreshes the due set,
//! - the drain timer, re-armed after each step while the queue is draining,
//! - [`FeedEvent`]s from the host (scroll, visibility, item actions).
//!
//! Because only this task touches the queue, a refresh always completes
//! before the next drain step reads the pending set.

use std::future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::GlobalConfig;
use crate::models::review::ReviewOutcome;
use crate::review::{now_ms, ReviewService};
use crate::Result;

use super::queue::{DrainStep, InsertionQueue};
use super::retry::RetryPolicy;
use super::{FeedEvent, FeedNotice, FeedView, Renderer};

/// Timing parameters for a [`FeedRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerTiming {
    /// Period of the due-scan.
    pub scan_interval: Duration,
    /// Spacing between drain steps.
    pub drain_delay: Duration,
    /// Readiness wait before the first scan.
    pub retry: RetryPolicy,
}

impl Default for RunnerTiming {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(60),
            drain_delay: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&GlobalConfig> for RunnerTiming {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            scan_interval: config.scan_interval(),
            drain_delay: Duration::from_millis(config.feed.drain_delay_ms),
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

/// Owns an [`InsertionQueue`] and feeds it from the store and the host.
pub struct FeedRunner<V, R>
where
    V: FeedView,
    R: Renderer<V::Anchor>,
{
    queue: InsertionQueue<V, R>,
    service: ReviewService,
    timing: RunnerTiming,
    events: mpsc::Receiver<FeedEvent>,
    notices: Option<mpsc::Sender<FeedNotice>>,
    cancel: CancellationToken,
    next_drain: Option<Instant>,
}

impl<V, R> FeedRunner<V, R>
where
    V: FeedView,
    R: Renderer<V::Anchor>,
{
    /// Construct a runner (does not start it yet).
    #[must_use]
    pub fn new(
        queue: InsertionQueue<V, R>,
        service: ReviewService,
        timing: RunnerTiming,
        events: mpsc::Receiver<FeedEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            service,
            timing,
            events,
            notices: None,
            cancel,
            next_drain: None,
        }
    }

    /// Report every insertion, retirement, review, and removal on `tx`.
    #[must_use]
    pub fn with_notices(mut self, tx: mpsc::Sender<FeedNotice>) -> Self {
        self.notices = Some(tx);
        self
    }

    /// Run until cancelled or the host closes its event channel.
    ///
    /// Returns the queue so the caller can inspect or reuse its final state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Feed` if the host view never becomes ready.
    pub async fn run(mut self) -> Result<InsertionQueue<V, R>> {
        let ready = {
            let view = self.queue.view();
            self.timing
                .retry
                .wait_until(&self.cancel, || view.is_ready())
                .await?
        };
        if !ready {
            debug!("feed runner cancelled before view was ready");
            return Ok(self.queue);
        }
        info!("feed runner started");

        let mut scan = tokio::time::interval(self.timing.scan_interval);
        scan.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let drain_at = self.next_drain;
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("feed runner shutting down");
                    break;
                }
                _ = scan.tick() => self.scan_due().await,
                () = Self::sleep_until(drain_at) => self.drain_once().await,
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("feed event channel closed");
                        break;
                    }
                },
            }
        }
        Ok(self.queue)
    }

    async fn sleep_until(at: Option<Instant>) {
        match at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => future::pending().await,
        }
    }

    fn schedule_drain(&mut self, delay: Duration) {
        let at = Instant::now() + delay;
        self.next_drain = Some(self.next_drain.map_or(at, |current| current.min(at)));
    }

    async fn scan_due(&mut self) {
        let now = now_ms();
        match self.service.due_items(now).await {
            Ok(due) => {
                debug!(due = due.len(), "due scan");
                if self.queue.refresh_due_set(due) {
                    self.schedule_drain(Duration::ZERO);
                }
            }
            Err(err) => error!(%err, "due scan failed"),
        }
    }

    async fn drain_once(&mut self) {
        self.next_drain = None;
        let step = self.queue.drain_step();
        let delay = match &step {
            DrainStep::Inserted { item_id, position } => {
                self.notify(FeedNotice::Inserted {
                    item_id: item_id.clone(),
                    position: *position,
                })
                .await;
                self.timing.drain_delay
            }
            DrainStep::Duplicate { .. } => Duration::ZERO,
            DrainStep::Idle | DrainStep::NoSlot { .. } | DrainStep::MountFailed { .. } => {
                self.timing.drain_delay
            }
        };
        if self.queue.is_processing() {
            self.schedule_drain(delay);
        }
    }

    async fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Scrolled { direction } => {
                let viewport = self.queue.view().viewport();
                let outcome = self.queue.on_scroll(direction, &viewport);
                for item_id in outcome.retired {
                    self.notify(FeedNotice::Retired { item_id }).await;
                }
                if outcome.resumed {
                    self.schedule_drain(Duration::ZERO);
                }
            }
            FeedEvent::VisibilityLost { item_id } => {
                let viewport = self.queue.view().viewport();
                if self.queue.retire_if_offscreen(&item_id, &viewport) {
                    self.notify(FeedNotice::Retired { item_id }).await;
                }
            }
            FeedEvent::ContentChanged => {
                if self.queue.wake() {
                    self.schedule_drain(Duration::ZERO);
                }
            }
            FeedEvent::Remembered { item_id } => {
                self.review(&item_id, ReviewOutcome::Positive).await;
            }
            FeedEvent::Forgotten { item_id } => {
                self.review(&item_id, ReviewOutcome::Negative).await;
            }
            FeedEvent::Removed { item_id } => match self.service.remove(&item_id).await {
                Ok(_) => {
                    self.queue.remove(&item_id);
                    self.notify(FeedNotice::Removed { item_id }).await;
                }
                Err(err) => error!(%item_id, %err, "failed to remove item"),
            },
        }
    }

    async fn review(&mut self, item_id: &str, outcome: ReviewOutcome) {
        match self.service.mark(item_id, outcome, now_ms()).await {
            Ok(Some(item)) => {
                self.queue.show_next_review(item_id, item.next_review);
                self.notify(FeedNotice::Reviewed {
                    item_id: item.id,
                    next_review: item.next_review,
                })
                .await;
            }
            Ok(None) => debug!(item_id, "review for unknown item ignored"),
            Err(err) => error!(item_id, %err, "failed to record review"),
        }
    }

    async fn notify(&self, notice: FeedNotice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice).await;
        }
    }
}

impl<V, R> FeedRunner<V, R>
where
    V: FeedView + Send + Sync + 'static,
    V::Anchor: Send,
    R: Renderer<V::Anchor> + Send + Sync + 'static,
    R::Handle: Send + Sync,
{
    /// Spawn [`run`](Self::run) on the tokio runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<Result<InsertionQueue<V, R>>> {
        tokio::spawn(self.run().instrument(info_span!("feed_runner")))
    }
}

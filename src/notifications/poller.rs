use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::error::{BackofficeError, Result};
use crate::fetch::Settlement;
use crate::query::Epoch;

use super::{NotificationSource, UnreadBadgeState, UnreadSummary};

/// Pending refresh signals; extra signals while one is queued are dropped
const REFRESH_CAPACITY: usize = 1;
const RESULT_CAPACITY: usize = 4;

/// Badge state plus the epoch guard for polls.
#[derive(Debug, Clone)]
pub struct BadgeTracker<T> {
    state: UnreadBadgeState<T>,
    epoch: Epoch,
    capacity: usize,
    /// The poll started under `epoch` has not settled yet
    in_flight: bool,
}

impl<T> BadgeTracker<T> {
    /// `capacity` bounds the recent item list.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: UnreadBadgeState::default(),
            epoch: Epoch::ZERO,
            capacity,
            in_flight: false,
        }
    }

    pub fn state(&self) -> &UnreadBadgeState<T> {
        &self.state
    }

    pub fn is_polling(&self) -> bool {
        self.in_flight
    }

    /// Start a poll; any poll started earlier becomes stale.
    pub fn begin_poll(&mut self) -> Epoch {
        self.epoch = self.epoch.next();
        self.in_flight = true;
        self.epoch
    }

    pub fn settle(
        &mut self,
        epoch: Epoch,
        result: Result<UnreadSummary<T>>,
        now: Timestamp,
    ) -> Settlement {
        if epoch != self.epoch {
            tracing::debug!(
                responded = epoch.value(),
                current = self.epoch.value(),
                "discarding stale unread poll"
            );
            return Settlement::Discarded;
        }

        self.in_flight = false;
        match result {
            Ok(summary) => {
                let mut items = summary.items;
                items.truncate(self.capacity);
                self.state = UnreadBadgeState {
                    count: summary.count,
                    recent_items: items,
                    last_fetched_at: Some(now),
                };
                Settlement::Accepted
            }
            Err(err) => {
                tracing::warn!("unread poll failed, keeping previous badge: {err}");
                Settlement::Failed
            }
        }
    }
}

/// Poll once and return the resulting badge. Never fails; a failed poll
/// yields an empty badge with no fetch time.
pub async fn poll_once<S>(source: &S, capacity: usize) -> UnreadBadgeState<S::Item>
where
    S: NotificationSource + ?Sized,
{
    let mut tracker = BadgeTracker::new(capacity);
    let epoch = tracker.begin_poll();
    let result = source.fetch_unread().await;
    tracker.settle(epoch, result, Timestamp::now());
    tracker.state
}

/// Front end of a running poller.
pub struct PollerHandle<T> {
    refresh: mpsc::Sender<()>,
    badge: watch::Receiver<UnreadBadgeState<T>>,
}

impl<T: Clone> PollerHandle<T> {
    /// Ask for a poll now, e.g. when the admin view regains focus.
    pub fn refresh(&self) -> Result<()> {
        match self.refresh.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(())) => Err(BackofficeError::SessionClosed),
        }
    }

    pub fn badge(&self) -> UnreadBadgeState<T> {
        self.badge.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UnreadBadgeState<T>> {
        self.badge.clone()
    }
}

/// Polls a [`NotificationSource`] on start, on every interval tick and on
/// every refresh signal, publishing accepted results.
///
/// At most one poll is in flight. Ticks that fire meanwhile are skipped; a
/// refresh signal is held and polled as soon as the pending poll settles.
pub struct NotificationPoller<S: NotificationSource> {
    source: Arc<S>,
    tracker: BadgeTracker<S::Item>,
    interval: Option<Duration>,
    authorized: bool,
}

impl<S> NotificationPoller<S>
where
    S: NotificationSource + 'static,
    S::Item: Clone + Send + Sync + 'static,
{
    pub fn new(source: Arc<S>, capacity: usize) -> Self {
        Self {
            source,
            tracker: BadgeTracker::new(capacity),
            interval: None,
            authorized: true,
        }
    }

    /// Poll every `period` in addition to start and refresh signals.
    pub fn with_interval(mut self, period: Duration) -> Self {
        self.interval = (!period.is_zero()).then_some(period);
        self
    }

    /// Resolved authorization of the current session; when false the
    /// poller never polls.
    pub fn authorized(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }

    pub fn spawn(self) -> (PollerHandle<S::Item>, JoinHandle<()>) {
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_CAPACITY);
        let (badge_tx, badge_rx) = watch::channel(UnreadBadgeState::default());
        let task = tokio::spawn(self.run(refresh_rx, badge_tx));
        (
            PollerHandle {
                refresh: refresh_tx,
                badge: badge_rx,
            },
            task,
        )
    }

    async fn run(
        mut self,
        mut refresh: mpsc::Receiver<()>,
        badge: watch::Sender<UnreadBadgeState<S::Item>>,
    ) {
        if !self.authorized {
            tracing::debug!("unread poller not authorized, staying idle");
            while refresh.recv().await.is_some() {}
            return;
        }

        let (results_tx, mut results) = mpsc::channel(RESULT_CAPACITY);
        let mut ticker = self.interval.map(|period| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.reset();
            ticker
        });

        let mut refresh_queued = false;
        self.poll(&results_tx);

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    if self.tracker.is_polling() {
                        tracing::debug!("unread poll still pending, skipping tick");
                    } else {
                        self.poll(&results_tx);
                    }
                }
                signal = refresh.recv() => match signal {
                    Some(()) if self.tracker.is_polling() => refresh_queued = true,
                    Some(()) => self.poll(&results_tx),
                    None => break,
                },
                Some((epoch, result)) = results.recv() => {
                    let settlement = self.tracker.settle(epoch, result, Timestamp::now());
                    if settlement == Settlement::Accepted {
                        badge.send_replace(self.tracker.state().clone());
                    }
                    if settlement != Settlement::Discarded && refresh_queued {
                        refresh_queued = false;
                        self.poll(&results_tx);
                    }
                }
            }
        }
        tracing::debug!("unread poller stopped");
    }

    fn poll(&mut self, results: &mpsc::Sender<(Epoch, Result<UnreadSummary<S::Item>>)>) {
        let epoch = self.tracker.begin_poll();
        let source = Arc::clone(&self.source);
        let results = results.clone();
        tokio::spawn(async move {
            let result = source.fetch_unread().await;
            let _ = results.send((epoch, result)).await;
        });
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

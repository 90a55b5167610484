//! The indicator aggregator: refresh cycle, publication and lifecycle.
//!
//! Lifecycle is explicit: construct, `init`, optionally `spawn_periodic`,
//! and finally `dispose`. A cycle moves through
//! `Loading -> Ready | Error`; every transition is published as a fresh
//! [`Snapshot`] so consumers never observe a partially updated dataset.

use super::assemble::{assemble_snapshot, FetchedSeries};
use super::{AggregatorSettings, CycleToken};
use crate::error::RefreshError;
use crate::models::{RefreshStatus, Series, SeriesKey, Snapshot};
use crate::source::SeriesFetcher;
use indicatif::ProgressBar;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Fetches the configured series, derives metrics and publishes snapshots.
pub struct IndicatorAggregator {
    settings: AggregatorSettings,
    fetcher: SeriesFetcher,
    published: watch::Sender<Arc<Snapshot>>,
    /// Token of the most recent cycle; replaced when a new cycle starts.
    current: Mutex<CycleToken>,
    shutdown: watch::Sender<bool>,
    progress: Option<ProgressBar>,
}

impl IndicatorAggregator {
    pub fn new(settings: AggregatorSettings, fetcher: SeriesFetcher) -> Self {
        let (published, _) = watch::channel(Arc::new(Snapshot::empty(settings.years)));
        let (shutdown, _) = watch::channel(false);

        Self {
            settings,
            fetcher,
            published,
            current: Mutex::new(CycleToken::new()),
            shutdown,
            progress: None,
        }
    }

    /// Report per-series progress on the given bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Receiver that always holds the latest published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.published.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.borrow().clone()
    }

    pub fn is_disposed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// First refresh after construction.
    pub async fn init(&self) -> Result<Arc<Snapshot>, RefreshError> {
        info!(
            "Initializing aggregator: {} series over {}",
            self.settings.series.len(),
            self.settings.years
        );
        self.refresh().await
    }

    /// Run one refresh cycle, superseding any cycle still in flight.
    ///
    /// On failure the previous dataset stays published with an error status.
    /// A cycle that is cancelled before it finishes publishes nothing.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let token = self.begin_cycle();
        let previous = self.snapshot();

        self.publish_if_current(&token, previous.with_status(RefreshStatus::Loading))
            .ok_or(RefreshError::Cancelled)?;

        let started = Instant::now();
        let outcome = tokio::select! {
            result = self.run_cycle(&token) => result,
            _ = token.cancelled() => Err(RefreshError::Cancelled),
        };

        match outcome {
            Ok(snapshot) => {
                let published = self
                    .publish_if_current(&token, snapshot)
                    .ok_or(RefreshError::Cancelled)?;
                info!(
                    "Refresh complete: {} series in {:.1}s",
                    published.aligned.len(),
                    started.elapsed().as_secs_f64()
                );
                Ok(published)
            }
            Err(RefreshError::Cancelled) => {
                debug!("Refresh cycle abandoned");
                Err(RefreshError::Cancelled)
            }
            Err(err) => {
                warn!("Refresh failed: {}", err);
                let failed = previous.with_status(RefreshStatus::Error(err.user_message()));
                self.publish_if_current(&token, failed)
                    .ok_or(RefreshError::Cancelled)?;
                Err(err)
            }
        }
    }

    /// Cancel the in-flight cycle and stop the periodic loop.
    pub fn dispose(&self) {
        let current = self.lock_current();
        // Mark disposed before releasing the lock so no new cycle gets a live token.
        self.shutdown.send_replace(true);
        current.cancel();
        drop(current);
        info!("Aggregator disposed");
    }

    /// Start the timer-driven refresh loop.
    ///
    /// The first tick fires one full interval after the call, since `init`
    /// is expected to have run already.
    pub fn spawn_periodic(self: &Arc<Self>) -> PeriodicHandle {
        let (trigger, mut requests) = mpsc::channel::<()>(1);
        let mut shutdown = self.shutdown.subscribe();
        let me = Arc::clone(self);

        let task = tokio::spawn(async move {
            let period = me.settings.refresh_interval;
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = interval.tick() => debug!("Refresh timer fired"),
                    Some(()) = requests.recv() => debug!("Manual refresh requested"),
                    _ = shutdown.changed() => continue,
                }
                match me.refresh().await {
                    Ok(_) | Err(RefreshError::Cancelled) => {}
                    Err(e) => warn!("Scheduled refresh failed: {}", e),
                }
            }
            debug!("Refresh loop stopped");
        });

        PeriodicHandle { trigger, task }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, CycleToken> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel the previous cycle and install a token for a new one.
    fn begin_cycle(&self) -> CycleToken {
        let mut current = self.lock_current();
        current.cancel();
        let token = CycleToken::new();
        if self.is_disposed() {
            token.cancel();
        }
        *current = token.clone();
        token
    }

    /// Publish `snapshot` unless `token` has been cancelled.
    ///
    /// Holding the cycle lock makes the check and the replacement atomic
    /// with respect to `dispose` and newer cycles.
    fn publish_if_current(&self, token: &CycleToken, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let _current = self.lock_current();
        if token.is_cancelled() {
            return None;
        }
        let snapshot = Arc::new(snapshot);
        self.published.send_replace(snapshot.clone());
        Some(snapshot)
    }

    async fn run_cycle(&self, token: &CycleToken) -> Result<Snapshot, RefreshError> {
        let mut fetched = FetchedSeries::default();

        // One request at a time, with a pause between them, to stay under the rate limit.
        for (i, entry) in self.settings.series.iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }
            token.check()?;
            let series = self.fetch(&entry.key()).await?;
            self.advance(&entry.label, 1);
            fetched.labelled.push((entry.clone(), series));
        }

        self.pause().await;
        token.check()?;

        // The two working-age series are independent of each other.
        let workforce = &self.settings.workforce;
        let (numerator, denominator) = futures::future::try_join(
            self.fetch(&workforce.numerator_working_age()),
            self.fetch(&workforce.denominator_working_age()),
        )
        .await?;
        self.advance("working-age share", 2);
        token.check()?;

        fetched.working_age_numerator = numerator;
        fetched.working_age_denominator = denominator;

        Ok(assemble_snapshot(&self.settings, &fetched))
    }

    async fn fetch(&self, key: &SeriesKey) -> Result<Series, RefreshError> {
        self.fetcher
            .fetch_series(key, &self.settings.years)
            .await
            .map_err(|e| RefreshError::fetch(key, e))
    }

    async fn pause(&self) {
        if !self.settings.inter_request_delay.is_zero() {
            self.fetcher
                .sleeper()
                .sleep(self.settings.inter_request_delay)
                .await;
        }
    }

    fn advance(&self, label: &str, requests: u64) {
        if let Some(ref progress) = self.progress {
            progress.set_message(label.to_string());
            progress.inc(requests);
        }
    }
}

/// Control handle of the periodic refresh loop.
pub struct PeriodicHandle {
    trigger: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PeriodicHandle {
    /// Request an immediate refresh; coalesced if one is already pending.
    pub fn trigger(&self) {
        if self.trigger.try_send(()).is_err() {
            debug!("Manual refresh already pending");
        }
    }

    /// Wait for the loop to exit after `dispose`.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            warn!("Refresh loop ended abnormally: {}", e);
        }
    }
}

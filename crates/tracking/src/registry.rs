//! Poll registry for long-running analysis jobs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use lectio_core::{JobId, StatusReport};

/// How often a tracked job is polled.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Poll registry configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Tick cadence per tracked job.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Why polling for a job ended without a terminal report.
#[derive(Debug, Error)]
pub enum PollError {
    /// The caller-supplied status fetch failed. Fail-fast: polling for this
    /// job stops and is not silently retried, so one broken job cannot
    /// starve the tick budget of the others.
    #[error("status fetch failed: {0}")]
    Fetch(#[source] anyhow::Error),
}

/// Final outcome of one tracked poll, delivered to the caller exactly once.
#[derive(Debug)]
pub struct PollOutcome {
    pub job_id: JobId,
    /// The terminal report (`done` or `failed` are both valid outcomes), or
    /// the fetch error that ended polling early.
    pub result: Result<StatusReport, PollError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of status fetches performed, including the final one.
    pub ticks: u32,
}

/// Live poll bookkeeping for one job id.
///
/// The epoch distinguishes a poll from its replacement after a restart, so
/// a result that resolves late can never finish a newer poll's entry.
#[derive(Debug)]
struct PollHandle {
    cancel: CancellationToken,
    epoch: u64,
}

type PollMap = Arc<Mutex<HashMap<JobId, PollHandle>>>;

/// Tracks the lifecycle of server-side analysis jobs by polling.
///
/// Guarantees at most one live poll per job id: starting a poll for an id
/// that is already tracked cancels the existing one before installing the
/// new one, so repeated `start` calls never stack timers. Ticks for one id
/// are strictly sequential (a tick runs to completion, fetch included,
/// before the next is scheduled); ticks for different ids are independent
/// tasks and may interleave.
///
/// Cancellation is cooperative: `stop` clears the handle synchronously, but
/// a fetch already in flight is not aborted — its late result is discarded
/// by an atomic registered-and-same-epoch check before anything observable
/// happens.
///
/// Must be used within a tokio runtime; each `start` spawns one task.
#[derive(Debug)]
pub struct PollRegistry {
    polls: PollMap,
    next_epoch: AtomicU64,
    config: PollConfig,
}

impl Default for PollRegistry {
    fn default() -> Self {
        Self::new(PollConfig::default())
    }
}

impl PollRegistry {
    pub fn new(config: PollConfig) -> Self {
        Self {
            polls: Arc::new(Mutex::new(HashMap::new())),
            next_epoch: AtomicU64::new(0),
            config,
        }
    }

    /// Begin polling a job until `is_terminal` accepts a report, a fetch
    /// fails, or the poll is stopped.
    ///
    /// `fetch` performs one status round-trip per tick (the first fires
    /// immediately). When polling ends with a terminal report or a fetch
    /// error, `on_outcome` is invoked exactly once; a stopped or replaced
    /// poll delivers nothing.
    pub fn start<F, Fut, P, C>(&self, job_id: JobId, fetch: F, is_terminal: P, on_outcome: C)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<StatusReport>> + Send + 'static,
        P: Fn(&StatusReport) -> bool + Send + 'static,
        C: FnOnce(PollOutcome) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let session = Uuid::now_v7();

        {
            let mut polls = self.polls.lock().unwrap();
            if let Some(previous) = polls.remove(&job_id) {
                previous.cancel.cancel();
                debug!(job_id = %job_id, "cancelled existing poll before restart");
            }
            polls.insert(
                job_id.clone(),
                PollHandle {
                    cancel: cancel.clone(),
                    epoch,
                },
            );
        }

        debug!(
            job_id = %job_id,
            session = %session,
            interval_ms = self.config.interval.as_millis() as u64,
            "poll started"
        );

        tokio::spawn(poll_loop(
            Arc::clone(&self.polls),
            job_id,
            epoch,
            session,
            self.config.interval,
            cancel,
            fetch,
            is_terminal,
            on_outcome,
        ));
    }

    /// Stop polling a job. Returns whether a poll was actually cancelled;
    /// stopping an untracked id is a no-op.
    pub fn stop(&self, job_id: &JobId) -> bool {
        let handle = self.polls.lock().unwrap().remove(job_id);
        match handle {
            Some(handle) => {
                handle.cancel.cancel();
                debug!(job_id = %job_id, "poll stopped");
                true
            }
            None => false,
        }
    }

    /// Cancel every outstanding poll and clear the registry. Safe to call
    /// with zero tracked jobs.
    pub fn stop_all(&self) {
        let drained: Vec<(JobId, PollHandle)> = {
            let mut polls = self.polls.lock().unwrap();
            polls.drain().collect()
        };
        for (_, handle) in &drained {
            handle.cancel.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "cancelled all tracked polls");
        }
    }

    pub fn is_tracking(&self, job_id: &JobId) -> bool {
        self.polls.lock().unwrap().contains_key(job_id)
    }

    pub fn tracked_count(&self) -> usize {
        self.polls.lock().unwrap().len()
    }
}

impl Drop for PollRegistry {
    /// Teardown of the owning view must not leak poll tasks.
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[allow(clippy::too_many_arguments)]
async fn poll_loop<F, Fut, P, C>(
    polls: PollMap,
    job_id: JobId,
    epoch: u64,
    session: Uuid,
    interval: Duration,
    cancel: CancellationToken,
    fetch: F,
    is_terminal: P,
    on_outcome: C,
) where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<StatusReport>> + Send + 'static,
    P: Fn(&StatusReport) -> bool + Send + 'static,
    C: FnOnce(PollOutcome) + Send + 'static,
{
    let started_at = Utc::now();
    let mut ticks: u32 = 0;

    let mut timer = tokio::time::interval(interval);
    // A fetch that overruns the interval delays the next tick; ticks for
    // one id never overlap.
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Biased so a cancellation that lands between ticks wins over a
            // tick that is due at the same instant.
            biased;
            _ = cancel.cancelled() => {
                trace!(job_id = %job_id, session = %session, "poll cancelled");
                return;
            }
            _ = timer.tick() => {}
        }

        ticks += 1;
        let result = fetch().await;

        // Mandatory stale-result check: the fetch is not aborted on
        // cancellation, so its result only counts if this poll still owns
        // the registry entry.
        match result {
            Err(error) => {
                if !claim_finish(&polls, &job_id, epoch) {
                    trace!(job_id = %job_id, session = %session, "discarded stale fetch error");
                    return;
                }
                warn!(
                    job_id = %job_id,
                    session = %session,
                    error = %error,
                    "status fetch failed; polling stopped"
                );
                on_outcome(PollOutcome {
                    job_id,
                    result: Err(PollError::Fetch(error)),
                    started_at,
                    finished_at: Utc::now(),
                    ticks,
                });
                return;
            }
            Ok(report) if is_terminal(&report) => {
                if !claim_finish(&polls, &job_id, epoch) {
                    trace!(job_id = %job_id, session = %session, "discarded stale terminal report");
                    return;
                }
                info!(
                    job_id = %job_id,
                    session = %session,
                    status = ?report.status,
                    ticks,
                    "job reached terminal status"
                );
                on_outcome(PollOutcome {
                    job_id,
                    result: Ok(report),
                    started_at,
                    finished_at: Utc::now(),
                    ticks,
                });
                return;
            }
            Ok(report) => {
                trace!(
                    job_id = %job_id,
                    session = %session,
                    status = ?report.status,
                    "job still in progress"
                );
            }
        }
    }
}

/// Atomically remove the entry for `job_id` if it still belongs to the poll
/// with `epoch`. Returns whether the caller may deliver an outcome.
fn claim_finish(polls: &Mutex<HashMap<JobId, PollHandle>>, job_id: &JobId, epoch: u64) -> bool {
    let mut polls = polls.lock().unwrap();
    match polls.get(job_id) {
        Some(handle) if handle.epoch == epoch => {
            polls.remove(job_id);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;

    use lectio_core::AnalysisStatus;

    fn test_registry() -> PollRegistry {
        lectio_observability::init();
        PollRegistry::default()
    }

    fn job(id: &str) -> JobId {
        JobId::new(id).unwrap()
    }

    fn running() -> StatusReport {
        StatusReport::bare(AnalysisStatus::Running)
    }

    fn terminal(report: &StatusReport) -> bool {
        report.status.is_terminal()
    }

    fn counting_fetch(
        fetches: &Arc<AtomicU32>,
    ) -> impl Fn() -> std::future::Ready<anyhow::Result<StatusReport>> + Send + 'static {
        let fetches = Arc::clone(fetches);
        move || {
            fetches.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(running()))
        }
    }

    fn collect_outcomes() -> (
        Arc<Mutex<Vec<PollOutcome>>>,
        impl FnOnce(PollOutcome) + Send + 'static,
    ) {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let outcomes = Arc::clone(&outcomes);
            move |outcome| outcomes.lock().unwrap().push(outcome)
        };
        (outcomes, sink)
    }

    /// Let spawned poll tasks run without advancing the clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    /// Advance virtual time one poll interval at a time.
    async fn tick_forward(intervals: u32) {
        for _ in 0..intervals {
            tokio::time::advance(DEFAULT_POLL_INTERVAL).await;
            settle().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restart_does_not_stack_timers() {
        let registry = test_registry();
        let fetches = Arc::new(AtomicU32::new(0));

        // Two rapid starts for the same id: the first poll is cancelled
        // before it ever runs, so only one timer survives.
        registry.start(job("j1"), counting_fetch(&fetches), terminal, |_| {});
        registry.start(job("j1"), counting_fetch(&fetches), terminal, |_| {});
        settle().await;
        tick_forward(3).await;

        // One immediate fetch plus one per interval; a stacked timer would
        // have doubled this.
        assert_eq!(fetches.load(Ordering::SeqCst), 4);
        assert_eq!(registry.tracked_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_status_delivers_final_report_once() {
        let registry = test_registry();
        let fetches = Arc::new(AtomicU32::new(0));
        let (outcomes, sink) = collect_outcomes();

        let counter = Arc::clone(&fetches);
        registry.start(
            job("j1"),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = if n < 2 {
                    AnalysisStatus::Running
                } else {
                    AnalysisStatus::Done
                };
                std::future::ready(Ok(StatusReport::bare(status)))
            },
            terminal,
            sink,
        );
        settle().await;
        tick_forward(5).await;

        // Polling stopped at the third fetch; later intervals fetch nothing.
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].ticks, 3);
        assert!(
            matches!(&outcomes[0].result, Ok(report) if report.status == AnalysisStatus::Done)
        );
        assert!(!registry.is_tracking(&job("j1")));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_is_delivered_like_done() {
        let registry = test_registry();
        let (outcomes, sink) = collect_outcomes();

        registry.start(
            job("j1"),
            || std::future::ready(Ok(StatusReport::bare(AnalysisStatus::Failed))),
            terminal,
            sink,
        );
        settle().await;

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(
            matches!(&outcomes[0].result, Ok(report) if report.status == AnalysisStatus::Failed)
        );
        assert_eq!(registry.tracked_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_stops_polling_without_retry() {
        let registry = test_registry();
        let fetches = Arc::new(AtomicU32::new(0));
        let (outcomes, sink) = collect_outcomes();

        let counter = Arc::clone(&fetches);
        registry.start(
            job("j1"),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Err(anyhow::anyhow!("connection reset")))
            },
            terminal,
            sink,
        );
        settle().await;
        tick_forward(3).await;

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(&outcomes[0].result, Err(PollError::Fetch(_))));
        assert!(!registry.is_tracking(&job("j1")));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_a_result_already_in_flight() {
        let registry = test_registry();
        let (outcomes, sink) = collect_outcomes();

        registry.start(
            job("j1"),
            || async {
                // Keep the fetch in flight across the stop call.
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(StatusReport::bare(AnalysisStatus::Done))
            },
            terminal,
            sink,
        );
        settle().await;
        assert!(registry.is_tracking(&job("j1")));

        assert!(registry.stop(&job("j1")));
        tokio::time::advance(Duration::from_millis(600)).await;
        settle().await;

        // The fetch resolved terminal after the stop; nothing may surface.
        assert!(outcomes.lock().unwrap().is_empty());
        assert_eq!(registry.tracked_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_on_untracked_id_is_a_noop() {
        let registry = test_registry();
        assert!(!registry.stop(&job("ghost")));
        registry.stop_all();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_cancels_every_pending_timer() {
        let registry = test_registry();
        let fetches = Arc::new(AtomicU32::new(0));

        for id in ["j1", "j2", "j3"] {
            registry.start(job(id), counting_fetch(&fetches), terminal, |_| {});
        }
        settle().await;
        tick_forward(2).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 9);
        assert_eq!(registry.tracked_count(), 3);

        registry.stop_all();
        assert_eq!(registry.tracked_count(), 0);

        tick_forward(3).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_all_behaves_like_first_start() {
        let registry = test_registry();
        let fetches = Arc::new(AtomicU32::new(0));

        registry.start(job("j1"), counting_fetch(&fetches), terminal, |_| {});
        settle().await;
        registry.stop_all();

        let restarted = Arc::new(AtomicU32::new(0));
        registry.start(job("j1"), counting_fetch(&restarted), terminal, |_| {});
        settle().await;
        tick_forward(2).await;

        assert_eq!(restarted.load(Ordering::SeqCst), 3);
        assert!(registry.is_tracking(&job("j1")));
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_poll_independently() {
        let registry = test_registry();
        let quick = Arc::new(AtomicU32::new(0));
        let slow = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&quick);
        registry.start(
            job("quick"),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Ok(StatusReport::bare(AnalysisStatus::Done)))
            },
            terminal,
            |_| {},
        );
        registry.start(job("slow"), counting_fetch(&slow), terminal, |_| {});
        settle().await;
        tick_forward(2).await;

        // The quick job finished on its first tick; the slow one kept going.
        assert_eq!(quick.load(Ordering::SeqCst), 1);
        assert_eq!(slow.load(Ordering::SeqCst), 3);
        assert!(!registry.is_tracking(&job("quick")));
        assert!(registry.is_tracking(&job("slow")));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_registry_tears_down_all_polls() {
        let fetches = Arc::new(AtomicU32::new(0));
        {
            let registry = test_registry();
            registry.start(job("j1"), counting_fetch(&fetches), terminal, |_| {});
            settle().await;
            assert_eq!(fetches.load(Ordering::SeqCst), 1);
        }
        tick_forward(3).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }
}

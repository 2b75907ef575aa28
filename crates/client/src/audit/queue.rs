//! Background recrawl queue.
//!
//! A scheduler task receives jobs over a channel and runs each one in a
//! `JoinSet`. A job first waits for its origin's turn, then takes one of the
//! global concurrency permits while still holding the turn, and books the
//! turn only once the permit is in hand. Waiting on the gate never holds a
//! permit. Failures and panics are logged and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Notify, Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use url::Url;

use super::Auditor;
use super::gate::OriginGate;
use crawliq_core::{AnalysisProfile, AuditKey, Error};

/// One background recrawl.
#[derive(Debug, Clone)]
pub struct Job {
    pub raw_url: String,
    pub key: AuditKey,
}

/// Counts queued plus running jobs and wakes `wait_idle` callers at zero.
#[derive(Default)]
struct Tracker {
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Decrements the tracker when a job finishes, panics included.
struct InFlightGuard(Arc<Tracker>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Handle to the running recrawl scheduler.
pub struct RecrawlQueue {
    tx: mpsc::UnboundedSender<Job>,
    tracker: Arc<Tracker>,
    profile: AnalysisProfile,
}

impl RecrawlQueue {
    /// Start the scheduler. Must be called from within a tokio runtime.
    pub fn start(auditor: Arc<Auditor>, gate: Arc<OriginGate>, concurrency: usize, profile: AnalysisProfile) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Arc::new(Tracker::default());
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        tokio::spawn(run_scheduler(rx, auditor, gate, semaphore, tracker.clone()));
        tracing::info!(concurrency, "recrawl queue started");

        Self { tx, tracker, profile }
    }

    /// Queue a recrawl of `raw_url`; returns immediately with its audit key.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the URL cannot be normalized
    /// - `QueueClosed` if the scheduler is no longer running
    pub fn enqueue(&self, raw_url: &str) -> Result<AuditKey, Error> {
        let key = self.profile.derive_key(raw_url)?;
        let job = Job { raw_url: raw_url.to_string(), key: key.clone() };

        self.tracker.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).is_err() {
            drop(InFlightGuard(self.tracker.clone()));
            return Err(Error::QueueClosed);
        }

        tracing::debug!(url = %key.normalized_url, audit_hash = %key.audit_hash, "recrawl queued");
        Ok(key)
    }

    /// Number of queued plus running jobs.
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight.load(Ordering::SeqCst)
    }

    /// Resolve once no job is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.tracker.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

async fn run_scheduler(
    mut rx: mpsc::UnboundedReceiver<Job>, auditor: Arc<Auditor>, gate: Arc<OriginGate>, semaphore: Arc<Semaphore>,
    tracker: Arc<Tracker>,
) {
    let mut jobs = JoinSet::new();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(job) => {
                    let guard = InFlightGuard(tracker.clone());
                    jobs.spawn(run_job(job, auditor.clone(), gate.clone(), semaphore.clone(), guard));
                }
                None => break,
            },
            Some(finished) = jobs.join_next(), if !jobs.is_empty() => log_join(finished),
        }
    }

    while let Some(finished) = jobs.join_next().await {
        log_join(finished);
    }
    tracing::info!("recrawl queue stopped");
}

async fn run_job(job: Job, auditor: Arc<Auditor>, gate: Arc<OriginGate>, semaphore: Arc<Semaphore>, _guard: InFlightGuard) {
    let url = match Url::parse(&job.key.normalized_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(url = %job.key.normalized_url, error = %e, "recrawl dropped: unparseable URL");
            return;
        }
    };

    let turn = gate.wait_turn(&url).await;
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return;
    };
    turn.book();

    tracing::info!(url = %job.key.normalized_url, audit_hash = %job.key.audit_hash, "recrawl started");
    match auditor.refresh(&job.key, &job.raw_url).await {
        Ok(entry) => tracing::info!(
            url = %job.key.normalized_url,
            overall = entry.report.scores.overall,
            "recrawl finished"
        ),
        Err(e) => tracing::warn!(url = %job.key.normalized_url, error = %e, "recrawl failed"),
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::error!(error = %e, "recrawl job panicked");
    }
}

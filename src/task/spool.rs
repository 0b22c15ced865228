//! The spool backend: durable submission plus a draining worker.
//!
//! [`SpoolRunner`] only writes jobs to disk; a [`SpoolWorker`], usually in a
//! separate process pointed at the same directory, claims and executes them.
//! A job survives a crash on either side of the directory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::TaskContext;
use crate::spool::{
    cleanup_done_jobs, cleanup_interrupted, drain_pending, mark_done, mark_processing, spool_job,
};
use crate::task::exec;
use crate::types::JobId;

use super::{Job, TaskRunner};

/// Builds a spool filename ID: submission time, process, sequence.
///
/// The time prefix makes lexicographic drain order match submission order
/// within a process; the pid and the process-wide counter keep concurrent
/// submitters from colliding.
fn next_job_id() -> JobId {
    static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let n = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
    JobId::new(format!(
        "{:013}-{:05}-{:06}",
        millis,
        std::process::id() % 100_000,
        n % 1_000_000
    ))
}

/// Submission side of the spool backend.
pub struct SpoolRunner {
    dir: PathBuf,
}

impl SpoolRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SpoolRunner { dir: dir.into() }
    }
}

impl TaskRunner for SpoolRunner {
    fn submit(&self, job: Job) {
        let id = next_job_id();
        match spool_job(&self.dir, &id, &job) {
            Ok(_) => debug!(kind = job.kind(), id = %id, "spooled job"),
            Err(e) => error!(kind = job.kind(), id = %id, error = %e, "failed to spool job"),
        }
    }
}

/// Drains and executes spooled jobs.
pub struct SpoolWorker {
    dir: PathBuf,
    ctx: Arc<TaskContext>,
    poll_interval: Duration,
    done_grace: Duration,
}

impl SpoolWorker {
    pub fn new(dir: impl Into<PathBuf>, ctx: Arc<TaskContext>) -> Self {
        SpoolWorker {
            dir: dir.into(),
            ctx,
            poll_interval: Duration::from_secs(1),
            done_grace: Duration::from_secs(3600),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// How long finished jobs keep their files before the worker deletes
    /// them.
    pub fn with_done_grace(mut self, done_grace: Duration) -> Self {
        self.done_grace = done_grace;
        self
    }

    /// Runs until the token is cancelled.
    ///
    /// Requeues jobs interrupted by a previous crash once at startup, then
    /// alternates between draining and sleeping for the poll interval. Each
    /// pass also sweeps out done jobs older than the grace period, so the
    /// directory does not grow without bound.
    pub async fn run(&self, shutdown: CancellationToken) -> crate::spool::Result<()> {
        cleanup_interrupted(&self.dir)?;
        info!(dir = %self.dir.display(), "spool worker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("spool worker shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    self.drain_once().await?;
                    let removed = cleanup_done_jobs(&self.dir, self.done_grace)?;
                    if removed > 0 {
                        debug!(removed, "swept expired done jobs");
                    }
                }
            }
        }
    }

    /// Drains the directory once, executing every pending job.
    /// Returns the number of jobs executed.
    pub async fn drain_once(&self) -> crate::spool::Result<usize> {
        let pending = drain_pending(&self.dir)?;
        let count = pending.len();
        for spooled in pending {
            mark_processing(&spooled)?;
            match spooled.read_job() {
                Ok(job) => {
                    for follow_up in exec::run(&self.ctx, job).await {
                        let id = next_job_id();
                        if let Err(e) = spool_job(&self.dir, &id, &follow_up) {
                            error!(id = %id, error = %e, "failed to spool follow-up job");
                        }
                    }
                }
                // A payload that no longer parses can never succeed; mark it
                // done so it stops blocking the drain.
                Err(e) => warn!(id = %spooled.id, error = %e, "discarding unreadable job"),
            }
            mark_done(&spooled)?;
        }
        Ok(count)
    }
}

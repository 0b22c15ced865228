//! The broker backend: a fixed pool of in-process workers.
//!
//! Jobs are distributed round-robin over per-worker channels. Queued jobs
//! are not persisted; a crash loses whatever has not run yet. Workers stop
//! when the shutdown token fires.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::context::TaskContext;
use crate::task::exec;

use super::{Job, TaskRunner};

pub struct BrokerRunner {
    senders: Vec<mpsc::UnboundedSender<Job>>,
    next: AtomicUsize,
}

impl BrokerRunner {
    /// Spawns `workers` worker loops (at least one) on the current runtime.
    pub fn start(ctx: Arc<TaskContext>, workers: usize, shutdown: CancellationToken) -> Self {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        for index in 0..workers {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(worker_loop(
                index,
                ctx.clone(),
                tx.clone(),
                rx,
                shutdown.clone(),
            ));
            senders.push(tx);
        }
        info!(workers, "broker workers started");
        BrokerRunner {
            senders,
            next: AtomicUsize::new(0),
        }
    }
}

impl TaskRunner for BrokerRunner {
    fn submit(&self, job: Job) {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.senders.len();
        debug!(kind = job.kind(), worker = index, "queueing job");
        if self.senders[index].send(job).is_err() {
            error!(worker = index, "broker worker is gone; job dropped");
        }
    }
}

/// One worker: drains its own channel until shutdown.
///
/// The worker holds a sender to its own channel so follow-up jobs stay on
/// the worker that produced them.
async fn worker_loop(
    index: usize,
    ctx: Arc<TaskContext>,
    own_tx: mpsc::UnboundedSender<Job>,
    mut rx: mpsc::UnboundedReceiver<Job>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(worker = index, "broker worker shutting down");
                return;
            }
            job = rx.recv() => {
                let Some(job) = job else { return };
                for follow_up in exec::run(&ctx, job).await {
                    if own_tx.send(follow_up).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryHarness, ScriptedClassifier};
    use crate::task::test_support::wait_until;
    use crate::types::{Post, PostId, UserId};

    #[tokio::test(start_paused = true)]
    async fn jobs_are_executed_and_follow_ups_chain() {
        let harness =
            InMemoryHarness::new().with_classifier(ScriptedClassifier::with_score(0.9));
        harness.store.insert_post(Post::new(PostId(1), UserId(1)));
        let shutdown = CancellationToken::new();
        let runner = BrokerRunner::start(Arc::new(harness.context()), 2, shutdown.clone());

        runner.submit(Job::ScoreSpam { post: PostId(1) });

        wait_until(|| harness.classifier.indexed() == vec![PostId(1)]).await;
        assert!(harness.store.post(PostId(1)).unwrap().is_spam);
        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn round_robin_spreads_jobs_across_workers() {
        let harness = InMemoryHarness::new();
        for n in 1..=4 {
            let mut post = Post::new(PostId(n), UserId(1));
            post.not_spam = true;
            harness.store.insert_post(post);
        }
        let shutdown = CancellationToken::new();
        let runner = BrokerRunner::start(Arc::new(harness.context()), 2, shutdown.clone());

        for n in 1..=4 {
            runner.submit(Job::IndexSpam { post: PostId(n) });
        }

        wait_until(|| harness.classifier.indexed().len() == 4).await;
        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_workers_still_runs_one() {
        let harness = InMemoryHarness::new();
        let mut post = Post::new(PostId(1), UserId(1));
        post.not_spam = true;
        harness.store.insert_post(post);
        let shutdown = CancellationToken::new();
        let runner = BrokerRunner::start(Arc::new(harness.context()), 0, shutdown.clone());

        runner.submit(Job::IndexSpam { post: PostId(1) });
        wait_until(|| harness.classifier.indexed() == vec![PostId(1)]).await;
        shutdown.cancel();
    }
}

//! The execution backend seam.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{BackendKind, ConfigError, EngineConfig};
use crate::context::TaskContext;

use super::broker::BrokerRunner;
use super::spool::SpoolRunner;
use super::threaded::ThreadedRunner;
use super::Job;

/// An execution backend for submitted jobs.
///
/// `submit` is fire-and-forget: it never blocks on the job itself and never
/// reports job results back to the caller. Submission failures are logged by
/// the backend.
pub trait TaskRunner: Send + Sync {
    fn submit(&self, job: Job);
}

/// Builds the runner the configuration asks for.
///
/// Chosen once at startup; every submission afterwards goes through the same
/// backend. The spool backend returned here is submission-only; run a
/// [`super::spool::SpoolWorker`] alongside it to execute the jobs.
pub fn build_runner(
    config: &EngineConfig,
    ctx: Arc<TaskContext>,
    shutdown: CancellationToken,
) -> Result<Arc<dyn TaskRunner>, ConfigError> {
    let runner: Arc<dyn TaskRunner> = match config.backend {
        BackendKind::Threaded => Arc::new(ThreadedRunner::new(ctx)),
        BackendKind::Spool => {
            let dir = config.spool_dir.clone().ok_or(ConfigError::MissingSpoolDir)?;
            Arc::new(SpoolRunner::new(dir))
        }
        BackendKind::Broker => Arc::new(BrokerRunner::start(ctx, config.broker_workers, shutdown)),
    };
    info!(backend = %config.backend, "task runner ready");
    Ok(runner)
}

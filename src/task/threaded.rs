//! The threaded backend: one spawned task per job.
//!
//! Jobs run inside the submitting process with no persistence; anything in
//! flight at shutdown is lost. This is the default backend and the one used
//! in development.

use std::sync::Arc;

use tracing::debug;

use crate::context::TaskContext;
use crate::task::exec;

use super::{Job, TaskRunner};

#[derive(Clone)]
pub struct ThreadedRunner {
    ctx: Arc<TaskContext>,
}

impl ThreadedRunner {
    pub fn new(ctx: Arc<TaskContext>) -> Self {
        ThreadedRunner { ctx }
    }
}

impl TaskRunner for ThreadedRunner {
    fn submit(&self, job: Job) {
        debug!(kind = job.kind(), "spawning job");
        let runner = self.clone();
        tokio::spawn(async move {
            for follow_up in exec::run(&runner.ctx, job).await {
                runner.submit(follow_up);
            }
        });
    }
}

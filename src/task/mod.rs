//! Job submission and execution.
//!
//! A [`Job`] describes one unit of background work; a [`TaskRunner`] accepts
//! submissions and gets the job run on one of three backends. The backend is
//! picked once at startup from configuration via [`build_runner`]; the rest
//! of the system only ever sees the trait.

pub mod broker;
pub mod exec;
pub mod job;
pub mod runner;
pub mod spool;
pub mod threaded;

pub use broker::BrokerRunner;
pub use job::Job;
pub use runner::{build_runner, TaskRunner};
pub use spool::{SpoolRunner, SpoolWorker};
pub use threaded::ThreadedRunner;

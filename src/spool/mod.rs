//! Durable on-disk job spool.
//!
//! Jobs submitted through the spool backend are written to a directory as
//! JSON files and drained by a worker process. A job moves through three
//! states tracked by empty marker files next to the payload:
//!
//! - pending: `<id>.json` exists, no markers
//! - in progress: `<id>.json.proc` exists, no `.done`
//! - done: `<id>.json.done` exists
//!
//! Every write follows the temp-write, fsync, rename, directory-fsync
//! sequence so a crash at any point leaves either no job or a complete one.

pub mod drain;
pub mod fsync;
pub mod job_file;

pub use drain::{cleanup_done_jobs, cleanup_interrupted, count_pending, drain_pending};
pub use job_file::{
    mark_done, mark_processing, remove_job, spool_job, SpoolError, SpooledJob,
};

/// Result type for spool operations.
pub type Result<T> = std::result::Result<T, SpoolError>;

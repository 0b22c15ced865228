//! Herald - background task dispatch and notification fan-out for a
//! scientific forum.
//!
//! This library provides the job vocabulary, the pluggable execution
//! backends, and the spam, notification and award task bodies.

pub mod awards;
pub mod config;
pub mod context;
pub mod notify;
pub mod spam;
pub mod spool;
pub mod store;
pub mod task;
pub mod types;

//! Engine configuration, read once from the environment at startup.
//!
//! A bad value is a fatal startup error, never a silent fallback: the
//! execution backend in particular decides durability semantics, so running
//! with a backend other than the one the operator asked for is worse than
//! refusing to start.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::context::Settings;

const BACKEND_VAR: &str = "HERALD_TASK_BACKEND";
const SPOOL_DIR_VAR: &str = "HERALD_SPOOL_DIR";
const BROKER_WORKERS_VAR: &str = "HERALD_BROKER_WORKERS";
const FROM_EMAIL_VAR: &str = "HERALD_FROM_EMAIL";
const SPAM_THRESHOLD_VAR: &str = "HERALD_SPAM_THRESHOLD";
const SCORE_DELAY_VAR: &str = "HERALD_SCORE_DELAY_SECS";

/// Errors encountered while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown task backend {value:?}; expected threaded, spool or broker")]
    UnknownBackend { value: String },

    #[error("backend `spool` requires {SPOOL_DIR_VAR} to be set")]
    MissingSpoolDir,

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Which execution backend runs submitted jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Spawn a task per job in the current runtime. No durability.
    Threaded,
    /// Persist jobs to a spool directory; a separate worker drains it.
    Spool,
    /// Round-robin over a fixed pool of in-process worker channels.
    Broker,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threaded" => Ok(BackendKind::Threaded),
            "spool" => Ok(BackendKind::Spool),
            "broker" => Ok(BackendKind::Broker),
            other => Err(ConfigError::UnknownBackend {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendKind::Threaded => "threaded",
            BackendKind::Spool => "spool",
            BackendKind::Broker => "broker",
        };
        f.write_str(s)
    }
}

/// Full engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub backend: BackendKind,

    /// Spool directory; required when `backend` is [`BackendKind::Spool`].
    pub spool_dir: Option<PathBuf>,

    /// Worker pool size for the broker backend.
    pub broker_workers: usize,

    pub from_email: String,
    pub spam_threshold: f32,

    /// Pause before scoring a new post. Never below one second; the web
    /// layer's commit must land before the classifier reads the post.
    pub score_delay: Duration,
}

impl EngineConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(|var| std::env::var(var).ok())?;
        info!(
            backend = %config.backend,
            workers = config.broker_workers,
            threshold = config.spam_threshold,
            "engine configured"
        );
        Ok(config)
    }

    /// Reads configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match get(BACKEND_VAR) {
            Some(value) => value.parse()?,
            None => BackendKind::Threaded,
        };

        let spool_dir = get(SPOOL_DIR_VAR).map(PathBuf::from);
        if backend == BackendKind::Spool && spool_dir.is_none() {
            return Err(ConfigError::MissingSpoolDir);
        }

        let broker_workers = match get(BROKER_WORKERS_VAR) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                var: BROKER_WORKERS_VAR,
                value,
            })?,
            None => 4,
        };

        let from_email =
            get(FROM_EMAIL_VAR).unwrap_or_else(|| Settings::default().from_email);

        let spam_threshold = match get(SPAM_THRESHOLD_VAR) {
            Some(value) => {
                let parsed: f32 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    var: SPAM_THRESHOLD_VAR,
                    value: value.clone(),
                })?;
                if !parsed.is_finite() {
                    return Err(ConfigError::InvalidValue {
                        var: SPAM_THRESHOLD_VAR,
                        value,
                    });
                }
                parsed
            }
            None => 0.5,
        };

        let score_delay = match get(SCORE_DELAY_VAR) {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    var: SCORE_DELAY_VAR,
                    value,
                })?;
                Duration::from_secs(secs.max(1))
            }
            None => Duration::from_secs(1),
        };

        Ok(EngineConfig {
            backend,
            spool_dir,
            broker_workers,
            from_email,
            spam_threshold,
            score_delay,
        })
    }

    /// The runtime settings slice of this configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            from_email: self.from_email.clone(),
            spam_threshold: self.spam_threshold,
            score_delay: self.score_delay,
        }
    }
}

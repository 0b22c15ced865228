//! User snapshot read from the external account store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// How often a user wants batched email digests.
///
/// Only [`DigestPreference::All`] matters to this engine: those users receive
/// every post through the digest batch job, so the per-event email path must
/// skip them to avoid double delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestPreference {
    Never,
    Daily,
    Weekly,
    Monthly,
    /// Every message, delivered by the digest mailer.
    All,
}

/// A forum user as the engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Display name, interpolated into notification templates.
    pub name: String,

    pub email: String,

    /// Comma-separated list of tag names the user watches,
    /// e.g. `"rna-seq, bioinformatics"`. Matched by the tag-watch notifier.
    pub watched_tags: String,

    pub digest: DigestPreference,

    /// Start of the user's current session. Awards are backdated to this
    /// moment rather than the time the award job happened to run.
    pub last_login: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        User {
            id,
            name: name.into(),
            email: email.into(),
            watched_tags: String::new(),
            digest: DigestPreference::Never,
            last_login: Utc::now(),
        }
    }

    pub fn with_watched_tags(mut self, tags: impl Into<String>) -> Self {
        self.watched_tags = tags.into();
        self
    }

    pub fn with_digest(mut self, digest: DigestPreference) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_last_login(mut self, last_login: DateTime<Utc>) -> Self {
        self.last_login = last_login;
        self
    }
}

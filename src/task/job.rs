//! The serializable job vocabulary.
//!
//! Every unit of background work is one of these variants. A job names its
//! inputs by ID and carries at most a template context; backends that
//! persist jobs serialize exactly this enum, so anything not representable
//! here cannot be submitted.

use serde::{Deserialize, Serialize};

use crate::types::{PostId, TemplateContext, UserId};

/// One unit of background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    /// Score a freshly created post and quarantine it if spammy.
    ScoreSpam { post: PostId },

    /// Add a labeled post to the classifier's training index.
    IndexSpam { post: PostId },

    /// Email users watching any of the post's thread tags.
    NotifyWatchedTags {
        post: PostId,
        #[serde(default)]
        context: TemplateContext,
    },

    /// Fan a new post out to the thread's subscribers.
    NotifyFollowers {
        root: PostId,
        author: UserId,
        #[serde(default)]
        context: TemplateContext,
    },

    /// Email an explicit recipient list about a post.
    MailingList {
        users: Vec<UserId>,
        post: PostId,
        #[serde(default)]
        context: TemplateContext,
    },

    /// Evaluate every award rule for a user.
    ComputeAwards { user: UserId },
}

impl Job {
    /// Stable job kind name, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Job::ScoreSpam { .. } => "score_spam",
            Job::IndexSpam { .. } => "index_spam",
            Job::NotifyWatchedTags { .. } => "notify_watched_tags",
            Job::NotifyFollowers { .. } => "notify_followers",
            Job::MailingList { .. } => "mailing_list",
            Job::ComputeAwards { .. } => "compute_awards",
        }
    }
}

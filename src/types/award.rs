//! Badges and awards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PostId, UserId};

/// A named achievement definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    pub desc: String,
}

impl Badge {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Badge {
            name: name.into(),
            desc: desc.into(),
        }
    }
}

/// A fact record: `user` earned `badge`, optionally for a specific post.
///
/// Invariant (post-scoped awards): at most one award exists per
/// `(user, badge, Some(post))`. User-scoped awards (`post == None`) carry no
/// such guarantee; see the award engine for the consequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub user: UserId,

    /// Badge name; badges are identified by name in the external store.
    pub badge: String,

    /// The post that earned the award, or `None` for user-scoped awards.
    pub post: Option<PostId>,

    /// When the award was earned. Backdated to the user's session start,
    /// not the time the background job ran.
    pub date: DateTime<Utc>,
}

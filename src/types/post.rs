//! Post snapshot read from the external post store.

use serde::{Deserialize, Serialize};

use super::ids::{PostId, UserId};

/// A forum post as the engine sees it.
///
/// The engine reads every field and writes only the spam fields, via
/// [`crate::store::PostStore::mark_spam`]. Everything else belongs to the
/// web layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,

    /// The user who wrote this post.
    pub author: UserId,

    /// Thread root. A top-level post is its own root; answers and comments
    /// point at the question that started the thread. Tags live on the root.
    pub root: PostId,

    /// Tag names attached to this post (populated on thread roots).
    pub tags: Vec<String>,

    /// Set when the classifier quarantined the post.
    pub is_spam: bool,

    /// Set when a moderator explicitly cleared the post.
    pub not_spam: bool,

    /// Last score assigned by the classifier, 0.0 if never scored.
    pub spam_score: f32,
}

impl Post {
    /// Creates a top-level post (its own thread root) with no tags.
    pub fn new(id: PostId, author: UserId) -> Self {
        Post {
            id,
            author,
            root: id,
            tags: Vec::new(),
            is_spam: false,
            not_spam: false,
            spam_score: 0.0,
        }
    }

    /// Sets the thread root (for answers and comments).
    pub fn with_root(mut self, root: PostId) -> Self {
        self.root = root;
        self
    }

    /// Sets the tag list.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// True if the post carries an explicit spam or ham label.
    ///
    /// Only labeled posts feed the spam index; unlabeled posts never do.
    pub fn has_spam_label(&self) -> bool {
        self.is_spam || self.not_spam
    }
}

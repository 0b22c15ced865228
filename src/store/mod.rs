//! Collaborator interfaces for the external data store and delivery channels.
//!
//! The engine never owns posts, users, subscriptions or awards; it reads
//! snapshots and issues writes through these traits. Implementations are
//! expected to provide their own single-row atomicity (the engine performs no
//! cross-call transactions).
//!
//! All traits are object-safe and synchronous: task bodies run inside
//! dedicated worker tasks, so blocking store calls are acceptable there.

use regex::Regex;
use thiserror::Error;

use crate::types::{Award, Post, Subscription, TemplateContext, PostId, User, UserId};

pub mod memory;

pub use memory::{
    InMemoryHarness, MemoryStore, RecordingEmailSender, RecordingMessenger, ScriptedClassifier,
};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An award for this `(user, badge, post)` already exists.
    ///
    /// Raised by stores that enforce post-scoped award uniqueness on insert,
    /// as a safety net behind the engine's check-then-create.
    #[error("duplicate award: user {user} already holds {badge:?} for this post")]
    DuplicateAward { user: UserId, badge: String },

    /// Backend failure (connection lost, query error, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Read/write access to posts.
pub trait PostStore: Send + Sync {
    /// Fetches a post by ID. `Ok(None)` if it does not exist.
    fn get(&self, id: PostId) -> Result<Option<Post>>;

    /// All posts written by a user, in unspecified order.
    fn posts_by_author(&self, author: UserId) -> Result<Vec<Post>>;

    /// Quarantines a post: sets `is_spam` and records the classifier score.
    fn mark_spam(&self, id: PostId, score: f32) -> Result<()>;
}

/// Read access to user accounts.
pub trait UserStore: Send + Sync {
    /// Fetches a user by ID. `Ok(None)` if it does not exist.
    fn get(&self, id: UserId) -> Result<Option<User>>;

    /// All users whose comma-separated watch list matches the pattern.
    ///
    /// The pattern is built by [`crate::notify::tags::watch_pattern`]; the
    /// store only applies it (mirroring a regex filter pushed to the
    /// database).
    fn find_watchers(&self, pattern: &Regex) -> Result<Vec<User>>;
}

/// Read access to thread subscriptions.
pub trait SubscriptionStore: Send + Sync {
    /// All subscriptions for a thread root.
    fn for_thread(&self, root: PostId) -> Result<Vec<Subscription>>;
}

/// Read/write access to awards.
pub trait AwardStore: Send + Sync {
    /// True if an award for `(user, badge, post)` already exists.
    fn exists(&self, user: UserId, badge: &str, post: Option<PostId>) -> Result<bool>;

    /// Inserts a new award record.
    fn create(&self, award: Award) -> Result<()>;

    /// All awards held by a user, in insertion order.
    fn awards_for(&self, user: UserId) -> Result<Vec<Award>>;
}

/// One outbound email transmission.
///
/// With `mass` set, the batch is a single transmission addressed to every
/// recipient at once rather than one send per address.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailBatch {
    /// Template name, e.g. `"messages/watched_tags.html"`.
    pub template: String,
    pub context: TemplateContext,
    pub recipients: Vec<String>,
    pub from: String,
    pub mass: bool,
}

/// Failure to hand a notification to a delivery channel.
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct SendError(pub String);

/// Outbound email channel.
pub trait EmailSender: Send + Sync {
    fn send(&self, batch: &EmailBatch) -> std::result::Result<(), SendError>;
}

/// In-app message channel.
pub trait MessageSender: Send + Sync {
    /// Creates one local message per recipient from the given template.
    fn create_messages(
        &self,
        template: &str,
        context: &TemplateContext,
        recipients: &[UserId],
        sender: UserId,
    ) -> std::result::Result<(), SendError>;
}

/// Failure inside the spam classifier or its index.
#[derive(Debug, Error)]
#[error("classifier error: {0}")]
pub struct ClassifyError(pub String);

/// Spam classifier and its training index.
pub trait Classifier: Send + Sync {
    /// Scores a post; higher means more spam-like. Range is classifier
    /// specific but thresholds assume roughly `0.0..=1.0`.
    fn score(&self, post: &Post) -> std::result::Result<f32, ClassifyError>;

    /// Adds a labeled post to the index. Callers must only pass posts with
    /// an explicit spam/ham label.
    fn index(&self, post: &Post) -> std::result::Result<(), ClassifyError>;
}

//! In-memory collaborators.
//!
//! These back the crate's own tests and double as dry-run implementations
//! for embedders, the same way a logging interpreter stands in for a real
//! API client. They are not suitable for production storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::context::{Settings, TaskContext};
use crate::types::{Award, DeliveryKind, Post, PostId, Subscription, TemplateContext, User, UserId};

use super::{
    AwardStore, ClassifyError, Classifier, EmailBatch, EmailSender, MessageSender, PostStore,
    Result, SendError, StoreError, SubscriptionStore, UserStore,
};

/// Locks a mutex, recovering the guard if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[derive(Default)]
struct MemoryInner {
    posts: HashMap<PostId, Post>,
    users: HashMap<UserId, User>,
    subscriptions: Vec<Subscription>,
    awards: Vec<Award>,
}

/// A single in-memory store implementing every store trait.
///
/// Locking is a single mutex over all tables; coarse, but it gives the
/// single-row atomicity the engine assumes, including the unique-insert
/// fence on post-scoped awards.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_post(&self, post: Post) {
        lock(&self.inner).posts.insert(post.id, post);
    }

    pub fn insert_user(&self, user: User) {
        lock(&self.inner).users.insert(user.id, user);
    }

    pub fn insert_subscription(&self, sub: Subscription) {
        lock(&self.inner).subscriptions.push(sub);
    }

    /// Snapshot of every award, for assertions.
    pub fn all_awards(&self) -> Vec<Award> {
        lock(&self.inner).awards.clone()
    }

    /// Snapshot of one post, for assertions.
    pub fn post(&self, id: PostId) -> Option<Post> {
        lock(&self.inner).posts.get(&id).cloned()
    }
}

impl PostStore for MemoryStore {
    fn get(&self, id: PostId) -> Result<Option<Post>> {
        Ok(lock(&self.inner).posts.get(&id).cloned())
    }

    fn posts_by_author(&self, author: UserId) -> Result<Vec<Post>> {
        let inner = lock(&self.inner);
        let mut posts: Vec<Post> = inner
            .posts
            .values()
            .filter(|p| p.author == author)
            .cloned()
            .collect();
        posts.sort_by_key(|p| p.id);
        Ok(posts)
    }

    fn mark_spam(&self, id: PostId, score: f32) -> Result<()> {
        let mut inner = lock(&self.inner);
        let post = inner
            .posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Backend(format!("no such post: {id}")))?;
        post.is_spam = true;
        post.spam_score = score;
        Ok(())
    }
}

impl UserStore for MemoryStore {
    fn get(&self, id: UserId) -> Result<Option<User>> {
        Ok(lock(&self.inner).users.get(&id).cloned())
    }

    fn find_watchers(&self, pattern: &Regex) -> Result<Vec<User>> {
        let inner = lock(&self.inner);
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| pattern.is_match(&u.watched_tags))
            .cloned()
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

impl SubscriptionStore for MemoryStore {
    fn for_thread(&self, root: PostId) -> Result<Vec<Subscription>> {
        Ok(lock(&self.inner)
            .subscriptions
            .iter()
            .filter(|s| s.root == root)
            .copied()
            .collect())
    }
}

impl AwardStore for MemoryStore {
    fn exists(&self, user: UserId, badge: &str, post: Option<PostId>) -> Result<bool> {
        Ok(lock(&self.inner)
            .awards
            .iter()
            .any(|a| a.user == user && a.badge == badge && a.post == post))
    }

    fn create(&self, award: Award) -> Result<()> {
        let mut inner = lock(&self.inner);
        // Unique-insert fence for post-scoped awards: the engine's pre-check
        // can race under concurrent workers, so the store rejects the
        // second insert instead of storing a duplicate.
        if award.post.is_some()
            && inner
                .awards
                .iter()
                .any(|a| a.user == award.user && a.badge == award.badge && a.post == award.post)
        {
            return Err(StoreError::DuplicateAward {
                user: award.user,
                badge: award.badge,
            });
        }
        inner.awards.push(award);
        Ok(())
    }

    fn awards_for(&self, user: UserId) -> Result<Vec<Award>> {
        Ok(lock(&self.inner)
            .awards
            .iter()
            .filter(|a| a.user == user)
            .cloned()
            .collect())
    }
}

/// Email sender that records every batch instead of sending.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailBatch>>,
    fail: bool,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender that rejects every batch, for failure-path tests.
    pub fn failing() -> Self {
        RecordingEmailSender {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailBatch> {
        lock(&self.sent).clone()
    }
}

impl EmailSender for RecordingEmailSender {
    fn send(&self, batch: &EmailBatch) -> std::result::Result<(), SendError> {
        if self.fail {
            return Err(SendError("smtp unavailable".to_string()));
        }
        lock(&self.sent).push(batch.clone());
        Ok(())
    }
}

/// One recorded `create_messages` call.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalBatch {
    pub template: String,
    pub recipients: Vec<UserId>,
    pub sender: UserId,
}

/// Local-message sender that records every batch instead of delivering.
#[derive(Default)]
pub struct RecordingMessenger {
    batches: Mutex<Vec<LocalBatch>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<LocalBatch> {
        lock(&self.batches).clone()
    }
}

impl MessageSender for RecordingMessenger {
    fn create_messages(
        &self,
        template: &str,
        _context: &TemplateContext,
        recipients: &[UserId],
        sender: UserId,
    ) -> std::result::Result<(), SendError> {
        lock(&self.batches).push(LocalBatch {
            template: template.to_string(),
            recipients: recipients.to_vec(),
            sender,
        });
        Ok(())
    }
}

/// Classifier returning a fixed score, optionally failing, recording what
/// was indexed.
pub struct ScriptedClassifier {
    score: f32,
    fail: bool,
    indexed: Mutex<Vec<PostId>>,
}

impl ScriptedClassifier {
    /// Always returns the given score.
    pub fn with_score(score: f32) -> Self {
        ScriptedClassifier {
            score,
            fail: false,
            indexed: Mutex::new(Vec::new()),
        }
    }

    /// Always fails, for failure-path tests.
    pub fn failing() -> Self {
        ScriptedClassifier {
            score: 0.0,
            fail: true,
            indexed: Mutex::new(Vec::new()),
        }
    }

    pub fn indexed(&self) -> Vec<PostId> {
        lock(&self.indexed).clone()
    }
}

impl Classifier for ScriptedClassifier {
    fn score(&self, _post: &Post) -> std::result::Result<f32, ClassifyError> {
        if self.fail {
            return Err(ClassifyError("classifier offline".to_string()));
        }
        Ok(self.score)
    }

    fn index(&self, post: &Post) -> std::result::Result<(), ClassifyError> {
        if self.fail {
            return Err(ClassifyError("classifier offline".to_string()));
        }
        lock(&self.indexed).push(post.id);
        Ok(())
    }
}

/// Bundle of in-memory collaborators plus a [`TaskContext`] wired to them.
///
/// The handles stay accessible so callers can seed data and assert on what
/// was delivered.
pub struct InMemoryHarness {
    pub store: Arc<MemoryStore>,
    pub email: Arc<RecordingEmailSender>,
    pub messages: Arc<RecordingMessenger>,
    pub classifier: Arc<ScriptedClassifier>,
}

impl InMemoryHarness {
    pub fn new() -> Self {
        InMemoryHarness {
            store: Arc::new(MemoryStore::new()),
            email: Arc::new(RecordingEmailSender::new()),
            messages: Arc::new(RecordingMessenger::new()),
            classifier: Arc::new(ScriptedClassifier::with_score(0.0)),
        }
    }

    pub fn with_classifier(mut self, classifier: ScriptedClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_email(mut self, email: RecordingEmailSender) -> Self {
        self.email = Arc::new(email);
        self
    }

    /// Builds a context over these collaborators with default settings and
    /// no award rules.
    pub fn context(&self) -> TaskContext {
        self.context_with(Settings::default(), Vec::new())
    }

    /// Builds a context with explicit settings and award rules.
    pub fn context_with(
        &self,
        settings: Settings,
        rules: Vec<Arc<dyn crate::awards::AwardRule>>,
    ) -> TaskContext {
        TaskContext {
            posts: self.store.clone(),
            users: self.store.clone(),
            subscriptions: self.store.clone(),
            awards: self.store.clone(),
            email: self.email.clone(),
            messages: self.messages.clone(),
            classifier: self.classifier.clone(),
            award_rules: rules,
            settings,
        }
    }
}

impl Default for InMemoryHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper: a subscribed user plus the matching subscription row.
pub fn subscribe(store: &MemoryStore, user: User, root: PostId, kind: DeliveryKind) {
    let id = user.id;
    store.insert_user(user);
    store.insert_subscription(Subscription::new(id, root, kind));
}

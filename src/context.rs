//! Shared environment handed to every task body.

use std::sync::Arc;
use std::time::Duration;

use crate::awards::AwardRule;
use crate::store::{
    AwardStore, Classifier, EmailSender, MessageSender, PostStore, SubscriptionStore, UserStore,
};

/// Runtime knobs read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Sender address for notification email.
    pub from_email: String,

    /// Score at or above which a post is quarantined.
    pub spam_threshold: f32,

    /// Pause before scoring a freshly created post, so the web layer's
    /// transaction has committed before the classifier reads it.
    pub score_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            from_email: "noreply@localhost".to_string(),
            spam_threshold: 0.5,
            score_delay: Duration::from_secs(1),
        }
    }
}

/// Everything a task body needs: stores, delivery channels, the classifier,
/// the award rule registry and settings.
///
/// Cheap to clone behind an `Arc`; one context is built at startup and shared
/// by every execution backend.
#[derive(Clone)]
pub struct TaskContext {
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub awards: Arc<dyn AwardStore>,
    pub email: Arc<dyn EmailSender>,
    pub messages: Arc<dyn MessageSender>,
    pub classifier: Arc<dyn Classifier>,

    /// Ordered award rule registry; evaluation follows this order.
    pub award_rules: Vec<Arc<dyn AwardRule>>,

    pub settings: Settings,
}

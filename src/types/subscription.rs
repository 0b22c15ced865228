//! Thread subscriptions, read-only to the engine.

use serde::{Deserialize, Serialize};

use super::ids::{PostId, UserId};

/// Delivery channel a subscriber chose for a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    /// Subscribed but muted; receives nothing.
    NoMessages,
    /// In-app message only.
    LocalMessage,
    /// In-app message plus per-event email.
    EmailMessage,
}

/// A user's subscription to a post thread.
///
/// Subscription state is mutated by the web layer; the engine only reads it
/// to compute notification recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user: UserId,
    pub root: PostId,
    pub kind: DeliveryKind,
}

impl Subscription {
    pub fn new(user: UserId, root: PostId, kind: DeliveryKind) -> Self {
        Subscription { user, root, kind }
    }
}

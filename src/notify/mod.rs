//! Notification fan-out: tag watchers, thread subscribers, mailing lists.

use thiserror::Error;

use crate::store::{SendError, StoreError};
use crate::types::PostId;

pub mod followers;
pub mod tags;

pub use followers::{mailing_list, notify_followers, FanOut};
pub use tags::{notify_watched_tags, watch_pattern};

/// Template rendered for tag-watch email.
pub const WATCHED_TAGS_TEMPLATE: &str = "messages/watched_tags.html";
/// Template rendered for subscriber in-app messages.
pub const SUBSCRIPTION_MESSAGE_TEMPLATE: &str = "messages/subscription_message.md";
/// Template rendered for subscriber email.
pub const SUBSCRIPTION_EMAIL_TEMPLATE: &str = "messages/subscription_email.html";
/// Template rendered for mailing-list email.
pub const MAILING_LIST_TEMPLATE: &str = "messages/mailing_list.html";

/// Errors from notification fan-out.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("unknown post: {0}")]
    UnknownPost(PostId),

    #[error("invalid watch pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Send(#[from] SendError),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

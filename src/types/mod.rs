//! Domain types shared across the engine.
//!
//! All entities here are snapshots of rows owned by the external data store;
//! the engine reads them and issues writes back through the store traits in
//! [`crate::store`].

pub mod award;
pub mod ids;
pub mod post;
pub mod subscription;
pub mod user;

pub use award::{Award, Badge};
pub use ids::{JobId, PostId, UserId};
pub use post::Post;
pub use subscription::{DeliveryKind, Subscription};
pub use user::{DigestPreference, User};

/// Extra template variables passed through to the email and message senders.
///
/// A `BTreeMap` keeps iteration (and thus serialized job payloads)
/// deterministic.
pub type TemplateContext = std::collections::BTreeMap<String, String>;

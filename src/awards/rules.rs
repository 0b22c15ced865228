//! Built-in award rules.

use super::{AwardRule, AwardStore, AwardTarget, PostStore, Result};
use crate::types::{Badge, User};
use std::sync::Arc;

/// Granted once for the user's earliest post.
pub struct FirstPost;

impl AwardRule for FirstPost {
    fn badge(&self) -> Badge {
        Badge::new("First Post", "Wrote a first post.")
    }

    fn validate(
        &self,
        user: &User,
        posts: &dyn PostStore,
        _awards: &dyn AwardStore,
    ) -> Result<Vec<AwardTarget>> {
        let mut posts = posts.posts_by_author(user.id)?;
        posts.sort_by_key(|p| p.id);
        Ok(posts
            .first()
            .map(|p| AwardTarget::Post(user.id, p.id))
            .into_iter()
            .collect())
    }
}

/// Granted once the user has written at least `threshold` posts.
///
/// User-scoped, so holders are filtered by checking existing awards rather
/// than relying on the engine's post-scoped deduplication.
pub struct ProlificPoster {
    pub threshold: usize,
}

impl AwardRule for ProlificPoster {
    fn badge(&self) -> Badge {
        Badge::new("Prolific Poster", "Wrote a large number of posts.")
    }

    fn validate(
        &self,
        user: &User,
        posts: &dyn PostStore,
        awards: &dyn AwardStore,
    ) -> Result<Vec<AwardTarget>> {
        let already = awards
            .awards_for(user.id)?
            .iter()
            .any(|a| a.badge == self.name());
        if already {
            return Ok(Vec::new());
        }
        if posts.posts_by_author(user.id)?.len() >= self.threshold {
            Ok(vec![AwardTarget::User(user.id)])
        } else {
            Ok(Vec::new())
        }
    }
}

/// The standard rule registry, in evaluation order.
pub fn default_rules() -> Vec<Arc<dyn AwardRule>> {
    vec![
        Arc::new(FirstPost),
        Arc::new(ProlificPoster { threshold: 50 }),
    ]
}

//! Award evaluation engine.
//!
//! Rules are registered explicitly in an ordered list and evaluated in that
//! order; there is no scanning for rule definitions at runtime. Each rule
//! proposes targets and the engine grants whatever is not already held,
//! backdating every grant to the user's current session start.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::TaskContext;
use crate::store::{AwardStore, PostStore, StoreError, UserStore};
use crate::types::{Award, Badge, PostId, User, UserId};

pub mod rules;

pub use rules::{default_rules, FirstPost, ProlificPoster};

/// What a rule proposes to grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardTarget {
    /// A user-scoped award, granted at most once per evaluation pass but not
    /// deduplicated across passes by the engine.
    User(UserId),
    /// A post-scoped award; at most one ever exists per `(user, badge, post)`.
    Post(UserId, PostId),
}

impl AwardTarget {
    fn user(&self) -> UserId {
        match self {
            AwardTarget::User(u) => *u,
            AwardTarget::Post(u, _) => *u,
        }
    }

    fn post(&self) -> Option<PostId> {
        match self {
            AwardTarget::User(_) => None,
            AwardTarget::Post(_, p) => Some(*p),
        }
    }
}

/// Errors from award evaluation.
#[derive(Debug, Error)]
pub enum AwardError {
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for award operations.
pub type Result<T> = std::result::Result<T, AwardError>;

/// A single badge-granting rule.
///
/// `validate` inspects the user's record and returns every target the badge
/// should be granted for. Returning targets that are already held is fine;
/// the engine filters those out before creating anything.
pub trait AwardRule: Send + Sync {
    /// The badge this rule grants. The badge name doubles as the
    /// deduplication key.
    fn badge(&self) -> Badge;

    /// Badge name shorthand.
    fn name(&self) -> String {
        self.badge().name
    }

    /// Targets this badge should be granted for, given the user's record.
    fn validate(
        &self,
        user: &User,
        posts: &dyn PostStore,
        awards: &dyn AwardStore,
    ) -> Result<Vec<AwardTarget>>;
}

/// Evaluates every registered rule for one user and grants what is missing.
///
/// Rules are isolated from each other: a failing rule is logged and skipped,
/// and the remaining rules still run. Returns the number of awards created.
pub fn compute_awards(ctx: &TaskContext, user: UserId) -> Result<usize> {
    let Some(user) = ctx.users.get(user)? else {
        return Err(AwardError::UnknownUser(user));
    };

    let mut created = 0;
    for rule in &ctx.award_rules {
        match apply_rule(ctx, rule.as_ref(), &user) {
            Ok(n) => created += n,
            Err(e) => {
                warn!(badge = %rule.name(), user = %user.id, error = %e, "award rule failed");
            }
        }
    }

    if created > 0 {
        info!(user = %user.id, created, "granted awards");
    }
    Ok(created)
}

fn apply_rule(ctx: &TaskContext, rule: &dyn AwardRule, user: &User) -> Result<usize> {
    let badge = rule.badge();
    let targets = rule.validate(user, ctx.posts.as_ref(), ctx.awards.as_ref())?;

    let mut created = 0;
    for target in targets {
        let post = target.post();
        if post.is_some() && ctx.awards.exists(target.user(), &badge.name, post)? {
            continue;
        }
        let award = Award {
            user: target.user(),
            badge: badge.name.clone(),
            post,
            // Session-start backdating: the job may run long after the
            // triggering action.
            date: user.last_login,
        };
        match ctx.awards.create(award) {
            Ok(()) => {
                debug!(badge = %badge.name, user = %target.user(), "created award");
                created += 1;
            }
            // Lost a race with a concurrent evaluation; the award exists,
            // which is the outcome we wanted.
            Err(StoreError::DuplicateAward { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

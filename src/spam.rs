//! Spam scoring and index maintenance.

use thiserror::Error;
use tracing::{debug, info};

use crate::context::TaskContext;
use crate::store::{Classifier, ClassifyError, PostStore, StoreError};
use crate::task::Job;
use crate::types::PostId;

/// Errors from spam scoring or indexing.
#[derive(Debug, Error)]
pub enum SpamError {
    #[error("unknown post: {0}")]
    UnknownPost(PostId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

/// Result type for spam operations.
pub type Result<T> = std::result::Result<T, SpamError>;

/// Scores a freshly created post and quarantines it when the score reaches
/// the configured threshold.
///
/// Waits out the configured delay first so the creating transaction has
/// committed before the post is read back. Quarantining labels the post
/// spam, which makes it index material, so a follow-up index job is
/// returned for the caller to submit.
pub async fn score_post(ctx: &TaskContext, post: PostId) -> Result<Vec<Job>> {
    tokio::time::sleep(ctx.settings.score_delay).await;

    let snapshot = ctx.posts.get(post)?.ok_or(SpamError::UnknownPost(post))?;
    let score = ctx.classifier.score(&snapshot)?;
    debug!(post = %post, score, "scored post");

    if score >= ctx.settings.spam_threshold {
        ctx.posts.mark_spam(post, score)?;
        info!(post = %post, score, "quarantined post as spam");
        return Ok(vec![Job::IndexSpam { post }]);
    }
    Ok(Vec::new())
}

/// Adds a post to the classifier's training index.
///
/// Only posts carrying an explicit spam or ham label are admitted; an
/// unlabeled post is skipped without touching the index.
pub fn index_post(ctx: &TaskContext, post: PostId) -> Result<()> {
    let snapshot = ctx.posts.get(post)?.ok_or(SpamError::UnknownPost(post))?;
    if !snapshot.has_spam_label() {
        debug!(post = %post, "skipping unlabeled post for spam index");
        return Ok(());
    }
    ctx.classifier.index(&snapshot)?;
    debug!(post = %post, "indexed labeled post");
    Ok(())
}

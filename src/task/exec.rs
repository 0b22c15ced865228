//! Running one job against the shared context.

use tracing::{error, instrument};

use crate::awards;
use crate::context::TaskContext;
use crate::notify;
use crate::spam;

use super::Job;

/// Executes one job and returns any follow-up jobs it produced.
///
/// Job failures are logged and swallowed here: a failing job must never
/// take down its worker or leak into an unrelated job. The only output of
/// a failed job is the error log line.
#[instrument(skip(ctx, job), fields(kind = job.kind()))]
pub async fn run(ctx: &TaskContext, job: Job) -> Vec<Job> {
    match job {
        Job::ScoreSpam { post } => match spam::score_post(ctx, post).await {
            Ok(follow_ups) => follow_ups,
            Err(e) => {
                error!(post = %post, error = %e, "spam scoring failed");
                Vec::new()
            }
        },
        Job::IndexSpam { post } => {
            if let Err(e) = spam::index_post(ctx, post) {
                error!(post = %post, error = %e, "spam indexing failed");
            }
            Vec::new()
        }
        Job::NotifyWatchedTags { post, context } => {
            if let Err(e) = notify::notify_watched_tags(ctx, post, &context) {
                error!(post = %post, error = %e, "tag-watch notification failed");
            }
            Vec::new()
        }
        Job::NotifyFollowers {
            root,
            author,
            context,
        } => {
            if let Err(e) = notify::notify_followers(ctx, root, author, &context) {
                error!(root = %root, error = %e, "subscriber notification failed");
            }
            Vec::new()
        }
        Job::MailingList {
            users,
            post,
            context,
        } => {
            if let Err(e) = notify::mailing_list(ctx, &users, post, &context) {
                error!(post = %post, error = %e, "mailing list send failed");
            }
            Vec::new()
        }
        Job::ComputeAwards { user } => {
            if let Err(e) = awards::compute_awards(ctx, user) {
                error!(user = %user, error = %e, "award evaluation failed");
            }
            Vec::new()
        }
    }
}

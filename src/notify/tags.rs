//! Email for users watching a tag on a new thread.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::{debug, info};

use crate::context::TaskContext;
use crate::store::{EmailBatch, EmailSender, PostStore, UserStore};
use crate::types::{PostId, TemplateContext};

use super::{NotifyError, Result, WATCHED_TAGS_TEMPLATE};

/// Builds the pattern matching `tag` as a whole entry of a comma-separated
/// watch list.
///
/// The tag must appear alone, at either end of the list, or between commas;
/// case-insensitively and with whitespace tolerated around separators. A
/// user watching `seq` must not match a post tagged `rna-seq`.
pub fn watch_pattern(tag: &str) -> std::result::Result<Regex, regex::Error> {
    let t = regex::escape(tag.trim());
    Regex::new(&format!(
        r"(?i)(^{t}\s*,|,\s*{t}\s*,|,\s*{t}$|^{t}$)"
    ))
}

/// Emails every user watching any of the thread's tags about `post`.
///
/// Tags are read from the thread root. Recipients are deduplicated by email
/// address, so a user watching several of the thread's tags gets one email.
/// Sends nothing when no watcher matches. Returns the recipient count.
pub fn notify_watched_tags(
    ctx: &TaskContext,
    post: PostId,
    extra: &TemplateContext,
) -> Result<usize> {
    let post = ctx.posts.get(post)?.ok_or(NotifyError::UnknownPost(post))?;
    let root = if post.root == post.id {
        post.clone()
    } else {
        ctx.posts
            .get(post.root)?
            .ok_or(NotifyError::UnknownPost(post.root))?
    };

    let mut emails = BTreeSet::new();
    for tag in &root.tags {
        let pattern = watch_pattern(tag)?;
        for watcher in ctx.users.find_watchers(&pattern)? {
            if !watcher.email.is_empty() {
                emails.insert(watcher.email);
            }
        }
    }

    if emails.is_empty() {
        debug!(post = %post.id, "no tag watchers to notify");
        return Ok(0);
    }

    let mut context = extra.clone();
    if let Some(author) = ctx.users.get(post.author)? {
        context.insert("user".to_string(), author.name);
    }
    context.insert("post".to_string(), post.id.to_string());

    let batch = EmailBatch {
        template: WATCHED_TAGS_TEMPLATE.to_string(),
        context,
        recipients: emails.into_iter().collect(),
        from: ctx.settings.from_email.clone(),
        // One transmission for the whole recipient set.
        mass: true,
    };
    let count = batch.recipients.len();
    ctx.email.send(&batch)?;
    info!(post = %post.id, recipients = count, "notified tag watchers");
    Ok(count)
}

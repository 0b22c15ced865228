//! Fan-out to thread subscribers and ad-hoc mailing lists.

use tracing::{debug, info};

use crate::context::TaskContext;
use crate::store::{EmailBatch, EmailSender, MessageSender, PostStore, SubscriptionStore, UserStore};
use crate::types::{DeliveryKind, DigestPreference, PostId, TemplateContext, UserId};

use super::{
    NotifyError, Result, MAILING_LIST_TEMPLATE, SUBSCRIPTION_EMAIL_TEMPLATE,
    SUBSCRIPTION_MESSAGE_TEMPLATE,
};

/// Counts of what one fan-out delivered, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanOut {
    pub local_messages: usize,
    pub emails: usize,
}

/// Notifies every subscriber of the thread rooted at `root` about a new post
/// by `author`.
///
/// Every subscriber not muted gets an in-app message. Subscribers on the
/// email channel also get an email, unless they take the everything digest,
/// which already carries each post. The author never hears about their own
/// post on either channel.
pub fn notify_followers(
    ctx: &TaskContext,
    root: PostId,
    author: UserId,
    extra: &TemplateContext,
) -> Result<FanOut> {
    let subs = ctx.subscriptions.for_thread(root)?;

    let mut locals = Vec::new();
    let mut emails = Vec::new();
    for sub in &subs {
        if sub.user == author || sub.kind == DeliveryKind::NoMessages {
            continue;
        }
        locals.push(sub.user);
        if sub.kind != DeliveryKind::EmailMessage {
            continue;
        }
        let Some(user) = ctx.users.get(sub.user)? else {
            continue;
        };
        if user.digest == DigestPreference::All || user.email.is_empty() {
            continue;
        }
        emails.push(user.email);
    }

    if !locals.is_empty() {
        ctx.messages
            .create_messages(SUBSCRIPTION_MESSAGE_TEMPLATE, extra, &locals, author)?;
    }
    if !emails.is_empty() {
        ctx.email.send(&EmailBatch {
            template: SUBSCRIPTION_EMAIL_TEMPLATE.to_string(),
            context: extra.clone(),
            recipients: emails.clone(),
            from: ctx.settings.from_email.clone(),
            // One transmission for the whole filtered subscriber set.
            mass: true,
        })?;
    }

    let result = FanOut {
        local_messages: locals.len(),
        emails: emails.len(),
    };
    debug!(
        root = %root,
        locals = result.local_messages,
        emails = result.emails,
        "notified thread subscribers"
    );
    Ok(result)
}

/// Emails an explicit recipient list about `post` in one mass transmission.
pub fn mailing_list(
    ctx: &TaskContext,
    users: &[UserId],
    post: PostId,
    extra: &TemplateContext,
) -> Result<usize> {
    let post = ctx.posts.get(post)?.ok_or(NotifyError::UnknownPost(post))?;

    let mut emails = Vec::new();
    for id in users {
        let Some(user) = ctx.users.get(*id)? else {
            continue;
        };
        if !user.email.is_empty() {
            emails.push(user.email);
        }
    }

    if emails.is_empty() {
        return Ok(0);
    }

    let mut context = extra.clone();
    context.insert("post".to_string(), post.id.to_string());

    let count = emails.len();
    ctx.email.send(&EmailBatch {
        template: MAILING_LIST_TEMPLATE.to_string(),
        context,
        recipients: emails,
        from: ctx.settings.from_email.clone(),
        mass: true,
    })?;
    info!(post = %post.id, recipients = count, "sent mailing list email");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::subscribe;
    use crate::store::InMemoryHarness;
    use crate::types::{Post, User};

    const ROOT: PostId = PostId(1);
    const AUTHOR: UserId = UserId(10);

    fn seeded() -> InMemoryHarness {
        let harness = InMemoryHarness::new();
        let store = &harness.store;
        store.insert_post(Post::new(ROOT, AUTHOR));
        subscribe(
            store,
            User::new(AUTHOR, "author", "author@example.org"),
            ROOT,
            DeliveryKind::EmailMessage,
        );
        subscribe(
            store,
            User::new(UserId(1), "muted", "muted@example.org"),
            ROOT,
            DeliveryKind::NoMessages,
        );
        subscribe(
            store,
            User::new(UserId(2), "local", "local@example.org"),
            ROOT,
            DeliveryKind::LocalMessage,
        );
        subscribe(
            store,
            User::new(UserId(3), "mail", "mail@example.org"),
            ROOT,
            DeliveryKind::EmailMessage,
        );
        subscribe(
            store,
            User::new(UserId(4), "digest", "digest@example.org")
                .with_digest(crate::types::DigestPreference::All),
            ROOT,
            DeliveryKind::EmailMessage,
        );
        harness
    }

    #[test]
    fn fan_out_respects_channel_and_digest() {
        let harness = seeded();
        let ctx = harness.context();

        let result = notify_followers(&ctx, ROOT, AUTHOR, &Default::default()).unwrap();

        // local, mail and digest get in-app messages; muted and the author
        // get nothing.
        assert_eq!(result.local_messages, 3);
        let batches = harness.messages.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].template, SUBSCRIPTION_MESSAGE_TEMPLATE);
        assert_eq!(batches[0].sender, AUTHOR);
        assert_eq!(batches[0].recipients, vec![UserId(2), UserId(3), UserId(4)]);

        // Only mail gets email: digest takes the everything digest and the
        // author is excluded.
        assert_eq!(result.emails, 1);
        let sent = harness.email.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients, vec!["mail@example.org"]);
        assert_eq!(sent[0].template, SUBSCRIPTION_EMAIL_TEMPLATE);
        assert!(sent[0].mass);
    }

    #[test]
    fn subscriber_email_is_one_mass_batch() {
        let harness = InMemoryHarness::new();
        let store = &harness.store;
        store.insert_post(Post::new(ROOT, AUTHOR));
        for (id, name, email) in [
            (UserId(1), "ann", "ann@example.org"),
            (UserId(2), "bob", "bob@example.org"),
            (UserId(3), "cyn", "cyn@example.org"),
        ] {
            subscribe(
                store,
                User::new(id, name, email),
                ROOT,
                DeliveryKind::EmailMessage,
            );
        }
        let ctx = harness.context();

        let result = notify_followers(&ctx, ROOT, AUTHOR, &Default::default()).unwrap();

        assert_eq!(result.emails, 3);
        let sent = harness.email.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].mass);
        assert_eq!(
            sent[0].recipients,
            vec!["ann@example.org", "bob@example.org", "cyn@example.org"]
        );
    }

    #[test]
    fn author_is_never_notified_of_own_post() {
        let harness = seeded();
        let ctx = harness.context();

        notify_followers(&ctx, ROOT, AUTHOR, &Default::default()).unwrap();

        for batch in harness.messages.batches() {
            assert!(!batch.recipients.contains(&AUTHOR));
        }
        for batch in harness.email.sent() {
            assert!(!batch.recipients.iter().any(|r| r == "author@example.org"));
        }
    }

    #[test]
    fn thread_without_subscribers_delivers_nothing() {
        let harness = InMemoryHarness::new();
        let ctx = harness.context();

        let result = notify_followers(&ctx, ROOT, AUTHOR, &Default::default()).unwrap();
        assert_eq!(result, FanOut::default());
        assert!(harness.messages.batches().is_empty());
        assert!(harness.email.sent().is_empty());
    }

    #[test]
    fn mailing_list_sends_one_mass_batch() {
        let harness = seeded();
        let ctx = harness.context();

        let count = mailing_list(
            &ctx,
            &[UserId(2), UserId(3), UserId(99)],
            ROOT,
            &Default::default(),
        )
        .unwrap();

        // Unknown user 99 is skipped.
        assert_eq!(count, 2);
        let sent = harness.email.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].mass);
        assert_eq!(sent[0].template, MAILING_LIST_TEMPLATE);
        assert_eq!(
            sent[0].recipients,
            vec!["local@example.org", "mail@example.org"]
        );
    }

    #[test]
    fn mailing_list_for_missing_post_is_an_error() {
        let harness = InMemoryHarness::new();
        let ctx = harness.context();
        assert!(matches!(
            mailing_list(&ctx, &[UserId(2)], PostId(77), &Default::default()),
            Err(NotifyError::UnknownPost(_))
        ));
    }
}

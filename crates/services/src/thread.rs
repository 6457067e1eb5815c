//! Threads, replies and votes.
//!
//! Thread, reply and forum ids in this service arrive as strings and are
//! parsed leniently with [`parse_id`].

use std::sync::Arc;

use domains::ports::{Store, ThreadRepo, UserRepo};
use domains::{
    Actor, Authored, NewReply, NewThread, Reply, ReplyPatch, Result, Thread, ThreadDetail,
    ThreadField, ThreadPatch, UserReply, UserThread, Vote,
};
use tracing::{info, instrument};

use crate::rules::{self, parse_id};

pub struct ThreadService {
    store: Arc<dyn Store>,
}

impl ThreadService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(actor = actor.user_id, forum_id = forum_id))]
    pub async fn create_thread(
        &self,
        actor: &Actor,
        forum_id: &str,
        title: String,
        text: String,
    ) -> Result<Thread> {
        let mut tx = self.store.begin().await?;
        let forum = rules::require_forum(&mut *tx, parse_id(forum_id)).await?;
        rules::require_member(&mut *tx, forum.id, actor.user_id).await?;

        let thread = tx
            .insert_thread(NewThread {
                forum_id: forum.id,
                title,
                text,
                created_by: actor.user_id,
            })
            .await?;
        tx.commit().await?;

        info!(thread_id = thread.id, "thread created");
        Ok(thread)
    }

    /// Sets the actor's vote on a thread, replacing any earlier vote.
    #[instrument(skip_all, fields(actor = actor.user_id, thread_id = thread_id, vote = vote))]
    pub async fn vote_thread(&self, actor: &Actor, thread_id: &str, vote: bool) -> Result<Vote> {
        let mut tx = self.store.begin().await?;
        let thread = rules::require_thread(&mut *tx, parse_id(thread_id)).await?;
        rules::require_member(&mut *tx, thread.forum_id, actor.user_id).await?;

        let vote = tx.upsert_thread_vote(thread.id, actor.user_id, vote).await?;
        tx.commit().await?;
        Ok(vote)
    }

    #[instrument(skip_all, fields(actor = actor.user_id, thread_id = thread_id))]
    pub async fn edit_thread(&self, actor: &Actor, thread_id: &str, patch: ThreadPatch) -> Result<Thread> {
        let mut tx = self.store.begin().await?;
        let thread = rules::require_thread(&mut *tx, parse_id(thread_id)).await?;
        rules::require_creator(thread.created_by, actor.user_id, Authored::Thread)?;

        let updated = tx.update_thread(thread.id, &patch).await?;
        tx.commit().await?;

        info!("thread edited");
        Ok(updated)
    }

    /// Moderator-only soft delete of a thread.
    #[instrument(skip_all, fields(actor = actor.user_id, thread_id = thread_id))]
    pub async fn delete_thread(&self, actor: &Actor, thread_id: &str) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let thread = rules::require_thread(&mut *tx, parse_id(thread_id)).await?;
        rules::require_moderator(&mut *tx, thread.forum_id, actor.user_id).await?;

        tx.soft_delete_thread(thread.id).await?;
        tx.commit().await?;

        info!("thread deleted");
        Ok(())
    }

    pub async fn thread_detail(&self, thread_id: &str) -> Result<ThreadDetail> {
        let mut tx = self.store.begin().await?;
        let thread = rules::require_thread(&mut *tx, parse_id(thread_id)).await?;
        let votes = tx.thread_vote_tally(thread.id).await?;
        let reply = tx.list_reply_fields(thread.id).await?;
        let created_by = tx
            .find_user_by_id(thread.created_by)
            .await?
            .map(|user| user.name)
            .unwrap_or_default();
        tx.commit().await?;

        Ok(ThreadDetail {
            thread: ThreadField {
                id: thread.id,
                title: thread.title,
                text: thread.text,
                created_at: thread.created_at,
            },
            total_replies: reply.len(),
            reply,
            votes,
            created_by,
        })
    }

    pub async fn list_my_threads(&self, actor: &Actor) -> Result<Vec<UserThread>> {
        let mut tx = self.store.begin().await?;
        let threads = tx.list_threads_by_creator(actor.user_id).await?;
        tx.commit().await?;
        Ok(threads)
    }

    #[instrument(skip_all, fields(actor = actor.user_id, thread_id = thread_id))]
    pub async fn create_reply(&self, actor: &Actor, thread_id: &str, text: String) -> Result<Reply> {
        let mut tx = self.store.begin().await?;
        let thread = rules::require_thread(&mut *tx, parse_id(thread_id)).await?;
        rules::require_member(&mut *tx, thread.forum_id, actor.user_id).await?;

        let reply = tx
            .insert_reply(NewReply {
                thread_id: thread.id,
                text,
                created_by: actor.user_id,
            })
            .await?;
        tx.commit().await?;

        info!(reply_id = reply.id, "reply created");
        Ok(reply)
    }

    #[instrument(skip_all, fields(actor = actor.user_id, reply_id = reply_id, vote = vote))]
    pub async fn vote_reply(&self, actor: &Actor, reply_id: &str, vote: bool) -> Result<Vote> {
        let mut tx = self.store.begin().await?;
        let (thread, reply) = rules::require_reply(&mut *tx, parse_id(reply_id)).await?;
        rules::require_member(&mut *tx, thread.forum_id, actor.user_id).await?;

        let vote = tx.upsert_reply_vote(reply.id, actor.user_id, vote).await?;
        tx.commit().await?;
        Ok(vote)
    }

    #[instrument(skip_all, fields(actor = actor.user_id, reply_id = reply_id))]
    pub async fn edit_reply(&self, actor: &Actor, reply_id: &str, patch: ReplyPatch) -> Result<Reply> {
        let mut tx = self.store.begin().await?;
        let (_, reply) = rules::require_reply(&mut *tx, parse_id(reply_id)).await?;
        rules::require_creator(reply.created_by, actor.user_id, Authored::Reply)?;

        let updated = tx.update_reply(reply.id, &patch).await?;
        tx.commit().await?;

        info!("reply edited");
        Ok(updated)
    }

    /// Moderator-only soft delete, gated on the reply's parent forum.
    #[instrument(skip_all, fields(actor = actor.user_id, reply_id = reply_id))]
    pub async fn delete_reply(&self, actor: &Actor, reply_id: &str) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let (thread, reply) = rules::require_reply(&mut *tx, parse_id(reply_id)).await?;
        rules::require_moderator(&mut *tx, thread.forum_id, actor.user_id).await?;

        tx.soft_delete_reply(reply.id).await?;
        tx.commit().await?;

        info!("reply deleted");
        Ok(())
    }

    pub async fn list_my_replies(&self, actor: &Actor) -> Result<Vec<UserReply>> {
        let mut tx = self.store.begin().await?;
        let replies = tx.list_replies_by_creator(actor.user_id).await?;
        tx.commit().await?;
        Ok(replies)
    }
}

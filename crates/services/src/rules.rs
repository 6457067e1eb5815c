//! Authorization gates shared by the forum and thread services.
//!
//! Each gate performs the minimal read needed to decide and turns a missing
//! row into the matching rejection. They all run inside the caller's
//! transaction so the decision and the following write see the same state.

use domains::ports::{ForumRepo, StoreTx, ThreadRepo};
use domains::{
    Authored, DomainError, Forum, Membership, Moderator, Reply, Result, Role, Thread,
};
use tracing::debug;

/// Lenient id parsing for string-encoded ids.
///
/// Unparsable input becomes `0`, which no row carries, so the following
/// lookup reports `NotFound`.
pub fn parse_id(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

/// Only regular accounts may open forums.
pub(crate) fn require_user_role(role: Role) -> Result<()> {
    if role != Role::User {
        debug!(%role, "role may not create forums");
        return Err(DomainError::RoleNotAuthorized);
    }
    Ok(())
}

pub(crate) async fn require_forum(tx: &mut dyn StoreTx, forum_id: i64) -> Result<Forum> {
    tx.find_forum_by_id(forum_id)
        .await?
        .ok_or(DomainError::NotFound("forum"))
}

pub(crate) async fn require_member(
    tx: &mut dyn StoreTx,
    forum_id: i64,
    user_id: i64,
) -> Result<Membership> {
    match tx.find_active_membership(forum_id, user_id).await? {
        Some(membership) => Ok(membership),
        None => {
            debug!(forum_id, user_id, "not an active member");
            Err(DomainError::NotMember)
        }
    }
}

/// Resolves the forum, then requires a moderator row of any rank.
pub(crate) async fn require_moderator(
    tx: &mut dyn StoreTx,
    forum_id: i64,
    user_id: i64,
) -> Result<(Forum, Moderator)> {
    let forum = require_forum(tx, forum_id).await?;
    match tx.find_moderator(forum.id, user_id).await? {
        Some(moderator) => Ok((forum, moderator)),
        None => {
            debug!(forum_id, user_id, "not a moderator");
            Err(DomainError::NotModerator)
        }
    }
}

pub(crate) fn require_creator(created_by: i64, user_id: i64, what: Authored) -> Result<()> {
    if created_by != user_id {
        debug!(created_by, user_id, %what, "not the author");
        return Err(DomainError::NotCreator(what));
    }
    Ok(())
}

pub(crate) async fn require_thread(tx: &mut dyn StoreTx, thread_id: i64) -> Result<Thread> {
    tx.find_thread(thread_id)
        .await?
        .ok_or(DomainError::NotFound("thread"))
}

/// Resolves a reply together with its parent thread.
pub(crate) async fn require_reply(tx: &mut dyn StoreTx, reply_id: i64) -> Result<(Thread, Reply)> {
    let reply = tx
        .find_reply(reply_id)
        .await?
        .ok_or(DomainError::NotFound("reply"))?;
    let thread = require_thread(tx, reply.thread_id).await?;
    Ok((thread, reply))
}

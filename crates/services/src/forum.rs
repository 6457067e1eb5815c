//! Forum lifecycle, membership and moderation rules.

use std::sync::Arc;

use domains::ports::{ForumRepo, Store, UserRepo};
use domains::{
    Actor, DomainError, Forum, ForumDetail, ForumPatch, ForumSearch, ForumSearchHit, HomeThread,
    Membership, ModeratorRank, NewForum, NewModerator, Result,
};
use tracing::{debug, info, instrument};

use crate::rules;

pub struct ForumService {
    store: Arc<dyn Store>,
}

impl ForumService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates the forum, its Head moderator and the creator's membership
    /// in one transaction.
    #[instrument(skip_all, fields(actor = actor.user_id))]
    pub async fn create_forum(&self, actor: &Actor, req: NewForum) -> Result<Forum> {
        rules::require_user_role(actor.role)?;

        let mut tx = self.store.begin().await?;
        if tx.find_forum_by_name(&req.name).await?.is_some() {
            debug!(name = %req.name, "forum name taken");
            return Err(DomainError::AlreadyExists("forum name already exists".into()));
        }
        let creator = tx
            .find_user_by_id(actor.user_id)
            .await?
            .ok_or(DomainError::Unauthorized)?;

        let forum = tx.insert_forum(req).await?;
        tx.insert_moderator(NewModerator {
            forum_id: forum.id,
            user_id: actor.user_id,
            rank: ModeratorRank::Head,
            nickname: Some(creator.name),
        })
        .await?;
        tx.insert_membership(forum.id, actor.user_id).await?;
        tx.commit().await?;

        info!(forum_id = forum.id, "forum created");
        Ok(forum)
    }

    #[instrument(skip_all, fields(actor = actor.user_id, forum_id = forum_id))]
    pub async fn join_forum(&self, actor: &Actor, forum_id: i64) -> Result<Membership> {
        let mut tx = self.store.begin().await?;
        let forum = rules::require_forum(&mut *tx, forum_id).await?;
        if tx.find_active_membership(forum.id, actor.user_id).await?.is_some() {
            return Err(DomainError::AlreadyMember);
        }
        let membership = tx.insert_membership(forum.id, actor.user_id).await?;
        tx.commit().await?;

        info!("joined forum");
        Ok(membership)
    }

    /// Succeeds only for a moderator (any rank) of a live forum.
    #[instrument(skip_all, fields(actor = actor.user_id, forum_id = forum_id))]
    pub async fn check_moderator(&self, actor: &Actor, forum_id: i64) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        rules::require_moderator(&mut *tx, forum_id, actor.user_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    #[instrument(skip_all, fields(actor = actor.user_id, forum_id = forum_id))]
    pub async fn edit_forum(&self, actor: &Actor, forum_id: i64, patch: ForumPatch) -> Result<Forum> {
        let mut tx = self.store.begin().await?;
        let (forum, _) = rules::require_moderator(&mut *tx, forum_id, actor.user_id).await?;

        if let Some(name) = patch.name.as_deref() {
            if name != forum.name && tx.find_forum_by_name(name).await?.is_some() {
                return Err(DomainError::AlreadyExists("forum name already exists".into()));
            }
        }
        let updated = tx.update_forum(forum.id, &patch).await?;
        tx.commit().await?;

        info!("forum edited");
        Ok(updated)
    }

    /// Soft-deletes the forum. Child rows are left in place; they become
    /// unreachable because every lookup filters on a live parent forum.
    #[instrument(skip_all, fields(actor = actor.user_id, forum_id = forum_id))]
    pub async fn delete_forum(&self, actor: &Actor, forum_id: i64) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let (forum, _) = rules::require_moderator(&mut *tx, forum_id, actor.user_id).await?;
        tx.soft_delete_forum(forum.id).await?;
        tx.commit().await?;

        info!("forum deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(actor = actor.user_id, forum_id = forum_id, target = user_id))]
    pub async fn remove_member(&self, actor: &Actor, forum_id: i64, user_id: i64) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let (forum, _) = rules::require_moderator(&mut *tx, forum_id, actor.user_id).await?;
        let membership = rules::require_member(&mut *tx, forum.id, user_id).await?;
        tx.mark_membership_removed(membership.id).await?;
        tx.commit().await?;

        info!("member removed");
        Ok(())
    }

    pub async fn list_my_forums(&self, actor: &Actor) -> Result<Vec<Forum>> {
        let mut tx = self.store.begin().await?;
        let forums = tx.list_member_forums(actor.user_id).await?;
        tx.commit().await?;
        Ok(forums)
    }

    /// Live forums the actor is not an active member of.
    pub async fn discover_forums(&self, actor: &Actor) -> Result<Vec<Forum>> {
        let mut tx = self.store.begin().await?;
        let forums = tx.list_unjoined_forums(actor.user_id).await?;
        tx.commit().await?;
        Ok(forums)
    }

    #[instrument(skip_all, fields(actor = actor.user_id, forum_id = forum_id))]
    pub async fn forum_detail(&self, actor: &Actor, forum_id: i64) -> Result<ForumDetail> {
        let mut tx = self.store.begin().await?;
        let forum = rules::require_forum(&mut *tx, forum_id).await?;
        let threads = tx.list_forum_threads(forum.id).await?;
        let number_of_members = tx.count_active_members(forum.id).await?;
        let is_member = tx
            .find_active_membership(forum.id, actor.user_id)
            .await?
            .is_some();
        tx.commit().await?;

        Ok(ForumDetail {
            forum,
            total_threads: threads.len(),
            threads,
            number_of_members,
            is_member,
        })
    }

    /// Threads from every forum the actor belongs to, newest first.
    pub async fn list_home_threads(&self, actor: &Actor) -> Result<Vec<HomeThread>> {
        let mut tx = self.store.begin().await?;
        let threads = tx.list_home_threads(actor.user_id).await?;
        tx.commit().await?;
        Ok(threads)
    }

    pub async fn search_forums(&self, search: ForumSearch) -> Result<Vec<ForumSearchHit>> {
        let mut tx = self.store.begin().await?;
        let hits = tx.search_forums(&search).await?;
        tx.commit().await?;
        Ok(hits)
    }
}

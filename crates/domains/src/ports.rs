//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.
//!
//! Persistence is transaction-scoped: a [`Store`] hands out a [`StoreTx`],
//! every read and write of one rule-engine operation goes through it, and
//! nothing becomes visible to other requests until [`StoreTx::commit`].
//! Dropping a transaction without committing rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Actor, Forum, ForumPatch, ForumSearch, Membership, Moderator, NewForum, NewModerator,
    NewReply, NewThread, NewUser, Reply, ReplyPatch, Thread, ThreadPatch, User, Vote,
};
use crate::views::{
    ForumSearchHit, ForumThreadSummary, HomeThread, ReplyField, UserReply, UserThread, VoteTally,
};

/// Entry point to the persistent store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// An open transaction exposing every repository.
#[async_trait]
pub trait StoreTx: UserRepo + ForumRepo + ThreadRepo + Send {
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Account persistence.
#[async_trait]
pub trait UserRepo: Send {
    async fn find_user_by_id(&mut self, id: i64) -> Result<Option<User>>;
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_student_id(&mut self, student_id: &str) -> Result<Option<User>>;
    /// Fails with `AlreadyExists` when the email or student id is taken.
    async fn insert_user(&mut self, user: NewUser) -> Result<User>;
}

/// Forum, moderator and membership persistence plus forum read models.
#[async_trait]
pub trait ForumRepo: Send {
    // Forum rows
    async fn find_forum_by_id(&mut self, id: i64) -> Result<Option<Forum>>;
    async fn find_forum_by_name(&mut self, name: &str) -> Result<Option<Forum>>;
    /// Fails with `AlreadyExists` when a live forum holds the name.
    async fn insert_forum(&mut self, forum: NewForum) -> Result<Forum>;
    async fn update_forum(&mut self, id: i64, patch: &ForumPatch) -> Result<Forum>;
    async fn soft_delete_forum(&mut self, id: i64) -> Result<()>;

    // Moderators
    async fn find_moderator(&mut self, forum_id: i64, user_id: i64) -> Result<Option<Moderator>>;
    async fn insert_moderator(&mut self, moderator: NewModerator) -> Result<Moderator>;

    // Memberships
    /// Active (`is_removed = false`) membership only. Holds a shared row lock
    /// for the rest of the transaction where the store supports it.
    async fn find_active_membership(
        &mut self,
        forum_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>>;
    /// Fails with `AlreadyMember` when an active row already exists.
    async fn insert_membership(&mut self, forum_id: i64, user_id: i64) -> Result<Membership>;
    async fn mark_membership_removed(&mut self, membership_id: i64) -> Result<()>;
    async fn count_active_members(&mut self, forum_id: i64) -> Result<i64>;

    // Read models
    async fn list_member_forums(&mut self, user_id: i64) -> Result<Vec<Forum>>;
    async fn list_unjoined_forums(&mut self, user_id: i64) -> Result<Vec<Forum>>;
    async fn search_forums(&mut self, search: &ForumSearch) -> Result<Vec<ForumSearchHit>>;
    async fn list_forum_threads(&mut self, forum_id: i64) -> Result<Vec<ForumThreadSummary>>;
    async fn list_home_threads(&mut self, user_id: i64) -> Result<Vec<HomeThread>>;
}

/// Thread, reply and vote persistence.
///
/// Thread and reply lookups treat rows under a deleted parent as absent.
#[async_trait]
pub trait ThreadRepo: Send {
    // Threads
    async fn find_thread(&mut self, id: i64) -> Result<Option<Thread>>;
    async fn insert_thread(&mut self, thread: NewThread) -> Result<Thread>;
    async fn update_thread(&mut self, id: i64, patch: &ThreadPatch) -> Result<Thread>;
    async fn soft_delete_thread(&mut self, id: i64) -> Result<()>;
    /// Sets the caller's vote, inserting it if none exists. Never duplicates.
    async fn upsert_thread_vote(&mut self, thread_id: i64, user_id: i64, vote: bool)
        -> Result<Vote>;
    async fn thread_vote_tally(&mut self, thread_id: i64) -> Result<VoteTally>;
    async fn list_threads_by_creator(&mut self, user_id: i64) -> Result<Vec<UserThread>>;

    // Replies
    async fn find_reply(&mut self, id: i64) -> Result<Option<Reply>>;
    async fn insert_reply(&mut self, reply: NewReply) -> Result<Reply>;
    async fn update_reply(&mut self, id: i64, patch: &ReplyPatch) -> Result<Reply>;
    async fn soft_delete_reply(&mut self, id: i64) -> Result<()>;
    async fn upsert_reply_vote(&mut self, reply_id: i64, user_id: i64, vote: bool)
        -> Result<Vote>;
    /// Live replies of a thread, oldest first, each with its vote aggregate.
    async fn list_reply_fields(&mut self, thread_id: i64) -> Result<Vec<ReplyField>>;
    async fn list_replies_by_creator(&mut self, user_id: i64) -> Result<Vec<UserReply>>;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String>;
    /// `Ok(false)` on mismatch or an unparsable hash.
    async fn verify(&self, hash: &str, password: &str) -> Result<bool>;
}

/// A signed bearer token and the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signed-token contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, actor: &Actor) -> Result<IssuedToken>;
    /// Any malformed, forged or expired token is `Unauthorized`.
    fn verify(&self, token: &str) -> Result<Actor>;
}

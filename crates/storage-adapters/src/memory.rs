//! # In-memory store
//!
//! A `Store` backed by plain maps, used by tests and by local runs without a
//! database. Transactions are serialized: `begin` takes a global async lock
//! and works on a private copy of the tables, which `commit` publishes.
//! Dropping an uncommitted transaction releases the lock and discards the
//! copy.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::ports::{ForumRepo, Store, StoreTx, ThreadRepo, UserRepo};
use domains::{
    DomainError, Forum, ForumPatch, ForumSearch, ForumSearchHit, ForumThreadSummary, HomeThread,
    Membership, Moderator, NewForum, NewModerator, NewReply, NewThread, NewUser, Reply, ReplyField,
    ReplyPatch, Result, Role, Thread, ThreadPatch, User, UserReply, UserStatus, UserThread, Vote,
    VoteTally,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A stored row plus its soft-delete marker.
#[derive(Debug, Clone)]
struct Record<T> {
    row: T,
    deleted_at: Option<DateTime<Utc>>,
}

impl<T> Record<T> {
    fn new(row: T) -> Self {
        Self { row, deleted_at: None }
    }

    fn live(&self) -> Option<&T> {
        match self.deleted_at {
            None => Some(&self.row),
            Some(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, Record<User>>,
    forums: BTreeMap<i64, Record<Forum>>,
    memberships: BTreeMap<i64, Record<Membership>>,
    moderators: BTreeMap<i64, Record<Moderator>>,
    threads: BTreeMap<i64, Record<Thread>>,
    replies: BTreeMap<i64, Record<Reply>>,
    thread_votes: BTreeMap<i64, Record<Vote>>,
    reply_votes: BTreeMap<i64, Record<Vote>>,
    /// Tables whose inserts fail, for exercising rollback.
    rejected: BTreeSet<&'static str>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn accept_insert(&self, table: &'static str) -> Result<()> {
        if self.rejected.contains(table) {
            return Err(DomainError::internal(format!("insert into {table} rejected")));
        }
        Ok(())
    }

    fn live_user(&self, id: i64) -> Option<&User> {
        self.users.get(&id).and_then(Record::live)
    }

    fn live_forum(&self, id: i64) -> Option<&Forum> {
        self.forums.get(&id).and_then(Record::live)
    }

    /// A live thread under a live forum.
    fn visible_thread(&self, id: i64) -> Option<&Thread> {
        self.threads
            .get(&id)
            .and_then(Record::live)
            .filter(|t| self.live_forum(t.forum_id).is_some())
    }

    fn visible_reply(&self, id: i64) -> Option<&Reply> {
        self.replies
            .get(&id)
            .and_then(Record::live)
            .filter(|r| self.visible_thread(r.thread_id).is_some())
    }

    fn active_membership(&self, forum_id: i64, user_id: i64) -> Option<&Membership> {
        self.memberships
            .values()
            .filter_map(Record::live)
            .find(|m| m.forum_id == forum_id && m.user_id == user_id && !m.is_removed)
    }

    fn author_name(&self, user_id: i64) -> String {
        self.live_user(user_id).map(|u| u.name.clone()).unwrap_or_default()
    }

    fn tally(votes: &BTreeMap<i64, Record<Vote>>, target_id: i64) -> VoteTally {
        votes
            .values()
            .filter_map(Record::live)
            .filter(|v| v.target_id == target_id)
            .fold(VoteTally::default(), |mut acc, v| {
                if v.vote {
                    acc.total_upvotes += 1;
                } else {
                    acc.total_downvotes += 1;
                }
                acc
            })
    }

    fn upsert_vote(
        &mut self,
        replies: bool,
        target_id: i64,
        user_id: i64,
        vote: bool,
    ) -> Vote {
        let now = Utc::now();
        let existing = {
            let votes = if replies { &self.reply_votes } else { &self.thread_votes };
            votes
                .iter()
                .find(|(_, r)| r.row.target_id == target_id && r.row.user_id == user_id)
                .map(|(id, _)| *id)
        };
        let id = match existing {
            Some(id) => id,
            None => self.next_id(),
        };
        let votes = if replies { &mut self.reply_votes } else { &mut self.thread_votes };
        let record = votes.entry(id).or_insert_with(|| {
            Record::new(Vote {
                id,
                target_id,
                user_id,
                vote,
                created_at: now,
                updated_at: now,
            })
        });
        record.row.vote = vote;
        record.row.updated_at = now;
        record.deleted_at = None;
        record.row.clone()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Shared in-process store. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account directly, bypassing registration. Returns its id.
    pub async fn seed_user(&self, name: &str, email: &str, role: Role, password_hash: &str) -> i64 {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let now = Utc::now();
        tables.users.insert(
            id,
            Record::new(User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                role,
                profile_image: None,
                student_id: None,
                status: UserStatus::Active,
                created_at: now,
                updated_at: now,
            }),
        );
        id
    }

    /// Number of vote rows (live or not) a user has on a thread.
    pub async fn thread_vote_rows(&self, thread_id: i64, user_id: i64) -> usize {
        let tables = self.tables.lock().await;
        tables
            .thread_votes
            .values()
            .filter(|r| r.row.target_id == thread_id && r.row.user_id == user_id)
            .count()
    }

    /// Every moderator row of a forum, in insertion order.
    pub async fn moderators_of(&self, forum_id: i64) -> Vec<Moderator> {
        let tables = self.tables.lock().await;
        tables
            .moderators
            .values()
            .filter_map(Record::live)
            .filter(|m| m.forum_id == forum_id)
            .cloned()
            .collect()
    }

    /// Every membership row (active or removed) of a forum.
    pub async fn memberships_of(&self, forum_id: i64) -> Vec<Membership> {
        let tables = self.tables.lock().await;
        tables
            .memberships
            .values()
            .filter_map(Record::live)
            .filter(|m| m.forum_id == forum_id)
            .cloned()
            .collect()
    }

    pub async fn forum_count(&self) -> usize {
        let tables = self.tables.lock().await;
        tables.forums.values().filter_map(Record::live).count()
    }

    /// Makes every later insert into `table` fail with an internal error.
    pub async fn reject_inserts_into(&self, table: &'static str) {
        self.tables.lock().await.rejected.insert(table);
    }

    pub async fn accept_all_inserts(&self) {
        self.tables.lock().await.rejected.clear();
    }

    /// True while some transaction holds the store.
    pub fn in_transaction(&self) -> bool {
        self.tables.try_lock().is_err()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

/// An open in-memory transaction.
pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for MemoryTx {
    async fn find_user_by_id(&mut self, id: i64) -> Result<Option<User>> {
        Ok(self.work.live_user(id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        Ok(self
            .work
            .users
            .values()
            .filter_map(Record::live)
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_student_id(&mut self, student_id: &str) -> Result<Option<User>> {
        Ok(self
            .work
            .users
            .values()
            .filter_map(Record::live)
            .find(|u| u.student_id.as_deref() == Some(student_id))
            .cloned())
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        self.work.accept_insert("users")?;
        let taken = self.work.users.values().filter_map(Record::live).any(|u| {
            u.email == user.email
                || (user.student_id.is_some() && u.student_id == user.student_id)
        });
        if taken {
            return Err(DomainError::AlreadyExists("user already exists".into()));
        }

        let id = self.work.next_id();
        let now = Utc::now();
        let row = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: Role::User,
            profile_image: None,
            student_id: user.student_id,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.work.users.insert(id, Record::new(row.clone()));
        Ok(row)
    }
}

#[async_trait]
impl ForumRepo for MemoryTx {
    async fn find_forum_by_id(&mut self, id: i64) -> Result<Option<Forum>> {
        Ok(self.work.live_forum(id).cloned())
    }

    async fn find_forum_by_name(&mut self, name: &str) -> Result<Option<Forum>> {
        Ok(self
            .work
            .forums
            .values()
            .filter_map(Record::live)
            .find(|f| f.name == name)
            .cloned())
    }

    async fn insert_forum(&mut self, forum: NewForum) -> Result<Forum> {
        self.work.accept_insert("forums")?;
        if self.find_forum_by_name(&forum.name).await?.is_some() {
            return Err(DomainError::AlreadyExists("forum name already exists".into()));
        }
        let id = self.work.next_id();
        let now = Utc::now();
        let row = Forum {
            id,
            name: forum.name,
            introduction: forum.introduction,
            image: None,
            category: forum.category,
            created_at: now,
            updated_at: now,
        };
        self.work.forums.insert(id, Record::new(row.clone()));
        Ok(row)
    }

    async fn update_forum(&mut self, id: i64, patch: &ForumPatch) -> Result<Forum> {
        let record = self
            .work
            .forums
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or(DomainError::NotFound("forum"))?;
        let forum = &mut record.row;
        if let Some(name) = &patch.name {
            forum.name = name.clone();
        }
        if let Some(introduction) = &patch.introduction {
            forum.introduction = introduction.clone();
        }
        if let Some(image) = &patch.image {
            forum.image = Some(image.clone());
        }
        if let Some(category) = &patch.category {
            forum.category = Some(category.clone());
        }
        forum.updated_at = Utc::now();
        Ok(forum.clone())
    }

    async fn soft_delete_forum(&mut self, id: i64) -> Result<()> {
        if let Some(record) = self.work.forums.get_mut(&id) {
            record.deleted_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn find_moderator(&mut self, forum_id: i64, user_id: i64) -> Result<Option<Moderator>> {
        Ok(self
            .work
            .moderators
            .values()
            .filter_map(Record::live)
            .find(|m| m.forum_id == forum_id && m.user_id == user_id)
            .cloned())
    }

    async fn insert_moderator(&mut self, moderator: NewModerator) -> Result<Moderator> {
        self.work.accept_insert("moderators")?;
        let id = self.work.next_id();
        let row = Moderator {
            id,
            user_id: moderator.user_id,
            forum_id: moderator.forum_id,
            rank: moderator.rank,
            nickname: moderator.nickname,
            created_at: Utc::now(),
        };
        self.work.moderators.insert(id, Record::new(row.clone()));
        Ok(row)
    }

    async fn find_active_membership(
        &mut self,
        forum_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>> {
        Ok(self.work.active_membership(forum_id, user_id).cloned())
    }

    async fn insert_membership(&mut self, forum_id: i64, user_id: i64) -> Result<Membership> {
        self.work.accept_insert("user_forums")?;
        if self.work.active_membership(forum_id, user_id).is_some() {
            return Err(DomainError::AlreadyMember);
        }
        let id = self.work.next_id();
        let now = Utc::now();
        let row = Membership {
            id,
            user_id,
            forum_id,
            is_removed: false,
            created_at: now,
            updated_at: now,
        };
        self.work.memberships.insert(id, Record::new(row.clone()));
        Ok(row)
    }

    async fn mark_membership_removed(&mut self, membership_id: i64) -> Result<()> {
        if let Some(record) = self.work.memberships.get_mut(&membership_id) {
            record.row.is_removed = true;
            record.row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn count_active_members(&mut self, forum_id: i64) -> Result<i64> {
        let count = self
            .work
            .memberships
            .values()
            .filter_map(Record::live)
            .filter(|m| m.forum_id == forum_id && !m.is_removed)
            .count();
        Ok(count as i64)
    }

    async fn list_member_forums(&mut self, user_id: i64) -> Result<Vec<Forum>> {
        let work = &self.work;
        Ok(work
            .forums
            .values()
            .filter_map(Record::live)
            .filter(|f| work.active_membership(f.id, user_id).is_some())
            .cloned()
            .collect())
    }

    async fn list_unjoined_forums(&mut self, user_id: i64) -> Result<Vec<Forum>> {
        let work = &self.work;
        Ok(work
            .forums
            .values()
            .filter_map(Record::live)
            .filter(|f| work.active_membership(f.id, user_id).is_none())
            .cloned()
            .collect())
    }

    async fn search_forums(&mut self, search: &ForumSearch) -> Result<Vec<ForumSearchHit>> {
        let mut hits: Vec<ForumSearchHit> = self
            .work
            .forums
            .values()
            .filter_map(Record::live)
            .filter(|f| search.name.as_deref().is_none_or(|n| contains_ci(&f.name, n)))
            .filter(|f| {
                search.category.as_deref().is_none_or(|c| {
                    f.category.as_deref().is_some_and(|fc| contains_ci(fc, c))
                })
            })
            .map(|f| ForumSearchHit {
                id: f.id,
                forum_name: f.name.clone(),
                forum_image: f.image.clone(),
                category: f.category.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.forum_name.cmp(&b.forum_name));
        Ok(hits)
    }

    async fn list_forum_threads(&mut self, forum_id: i64) -> Result<Vec<ForumThreadSummary>> {
        let work = &self.work;
        Ok(work
            .threads
            .values()
            .rev()
            .filter_map(Record::live)
            .filter(|t| t.forum_id == forum_id)
            .map(|t| {
                let author = work.live_user(t.created_by);
                ForumThreadSummary {
                    id: t.id,
                    title: t.title.clone(),
                    text: t.text.clone(),
                    created_by: author.map(|u| u.name.clone()).unwrap_or_default(),
                    created_by_image: author.and_then(|u| u.profile_image.clone()),
                    created_at: t.created_at,
                }
            })
            .collect())
    }

    async fn list_home_threads(&mut self, user_id: i64) -> Result<Vec<HomeThread>> {
        let work = &self.work;
        Ok(work
            .threads
            .values()
            .rev()
            .filter_map(Record::live)
            .filter(|t| work.active_membership(t.forum_id, user_id).is_some())
            .filter_map(|t| {
                let forum = work.live_forum(t.forum_id)?;
                Some(HomeThread {
                    forum_id: forum.id,
                    forum_name: forum.name.clone(),
                    forum_image: forum.image.clone(),
                    thread_id: t.id,
                    title: t.title.clone(),
                    text: t.text.clone(),
                    created_by: work.author_name(t.created_by),
                    created_at: t.created_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ThreadRepo for MemoryTx {
    async fn find_thread(&mut self, id: i64) -> Result<Option<Thread>> {
        Ok(self.work.visible_thread(id).cloned())
    }

    async fn insert_thread(&mut self, thread: NewThread) -> Result<Thread> {
        self.work.accept_insert("threads")?;
        let id = self.work.next_id();
        let now = Utc::now();
        let row = Thread {
            id,
            forum_id: thread.forum_id,
            title: thread.title,
            text: thread.text,
            created_by: thread.created_by,
            number_of_upvotes: 0,
            number_of_downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        self.work.threads.insert(id, Record::new(row.clone()));
        Ok(row)
    }

    async fn update_thread(&mut self, id: i64, patch: &ThreadPatch) -> Result<Thread> {
        let record = self
            .work
            .threads
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or(DomainError::NotFound("thread"))?;
        let thread = &mut record.row;
        if let Some(title) = &patch.title {
            thread.title = title.clone();
        }
        if let Some(text) = &patch.text {
            thread.text = text.clone();
        }
        thread.updated_at = Utc::now();
        Ok(thread.clone())
    }

    async fn soft_delete_thread(&mut self, id: i64) -> Result<()> {
        if let Some(record) = self.work.threads.get_mut(&id) {
            record.deleted_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn upsert_thread_vote(&mut self, thread_id: i64, user_id: i64, vote: bool) -> Result<Vote> {
        Ok(self.work.upsert_vote(false, thread_id, user_id, vote))
    }

    async fn thread_vote_tally(&mut self, thread_id: i64) -> Result<VoteTally> {
        Ok(Tables::tally(&self.work.thread_votes, thread_id))
    }

    async fn list_threads_by_creator(&mut self, user_id: i64) -> Result<Vec<UserThread>> {
        let work = &self.work;
        Ok(work
            .threads
            .values()
            .rev()
            .filter_map(Record::live)
            .filter(|t| t.created_by == user_id)
            .filter_map(|t| {
                let forum = work.live_forum(t.forum_id)?;
                Some(UserThread {
                    thread: t.clone(),
                    forum_name: forum.name.clone(),
                    forum_image: forum.image.clone(),
                })
            })
            .collect())
    }

    async fn find_reply(&mut self, id: i64) -> Result<Option<Reply>> {
        Ok(self.work.visible_reply(id).cloned())
    }

    async fn insert_reply(&mut self, reply: NewReply) -> Result<Reply> {
        self.work.accept_insert("replies")?;
        let id = self.work.next_id();
        let now = Utc::now();
        let row = Reply {
            id,
            thread_id: reply.thread_id,
            text: reply.text,
            created_by: reply.created_by,
            number_of_upvotes: 0,
            number_of_downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        self.work.replies.insert(id, Record::new(row.clone()));
        Ok(row)
    }

    async fn update_reply(&mut self, id: i64, patch: &ReplyPatch) -> Result<Reply> {
        let record = self
            .work
            .replies
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or(DomainError::NotFound("reply"))?;
        if let Some(text) = &patch.text {
            record.row.text = text.clone();
        }
        record.row.updated_at = Utc::now();
        Ok(record.row.clone())
    }

    async fn soft_delete_reply(&mut self, id: i64) -> Result<()> {
        if let Some(record) = self.work.replies.get_mut(&id) {
            record.deleted_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn upsert_reply_vote(&mut self, reply_id: i64, user_id: i64, vote: bool) -> Result<Vote> {
        Ok(self.work.upsert_vote(true, reply_id, user_id, vote))
    }

    async fn list_reply_fields(&mut self, thread_id: i64) -> Result<Vec<ReplyField>> {
        let work = &self.work;
        Ok(work
            .replies
            .values()
            .filter_map(Record::live)
            .filter(|r| r.thread_id == thread_id)
            .map(|r| ReplyField {
                id: r.id,
                text: r.text.clone(),
                created_by: work.author_name(r.created_by),
                created_at: r.created_at,
                votes: Tables::tally(&work.reply_votes, r.id),
            })
            .collect())
    }

    async fn list_replies_by_creator(&mut self, user_id: i64) -> Result<Vec<UserReply>> {
        let work = &self.work;
        Ok(work
            .replies
            .values()
            .rev()
            .filter_map(Record::live)
            .filter(|r| r.created_by == user_id)
            .filter_map(|r| {
                let thread = work.visible_thread(r.thread_id)?;
                let forum = work.live_forum(thread.forum_id)?;
                Some(UserReply {
                    thread: thread.clone(),
                    reply: r.clone(),
                    forum_name: forum.name.clone(),
                    forum_image: forum.image.clone(),
                })
            })
            .collect())
    }
}

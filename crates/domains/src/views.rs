//! Read models computed at query time.
//!
//! Vote totals and member counts here are aggregates over vote rows and active
//! memberships, not the counters stored on the entity rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Forum, Reply, Thread};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub total_upvotes: i64,
    pub total_downvotes: i64,
}

/// Thread row as listed on a forum page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumThreadSummary {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub created_by: String,
    pub created_by_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumDetail {
    pub forum: Forum,
    pub threads: Vec<ForumThreadSummary>,
    pub total_threads: usize,
    pub number_of_members: i64,
    pub is_member: bool,
}

/// One entry of the home feed: a thread from a forum the viewer belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeThread {
    pub forum_id: i64,
    pub forum_name: String,
    pub forum_image: Option<String>,
    pub thread_id: i64,
    pub title: String,
    pub text: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumSearchHit {
    pub id: i64,
    pub forum_name: String,
    pub forum_image: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadField {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyField {
    pub id: i64,
    pub text: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub votes: VoteTally,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDetail {
    pub thread: ThreadField,
    pub reply: Vec<ReplyField>,
    pub total_replies: usize,
    #[serde(flatten)]
    pub votes: VoteTally,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserThread {
    pub thread: Thread,
    pub forum_name: String,
    pub forum_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReply {
    pub thread: Thread,
    pub reply: Reply,
    pub forum_name: String,
    pub forum_image: Option<String>,
}

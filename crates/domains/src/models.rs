//! # Domain Models
//!
//! These structs represent the core entities of talkboard.
//! Rows are keyed by database-assigned `i64` ids and soft-deleted: a deleted
//! row never comes back out of a port method.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Account role. Only `User` accounts may create forums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "User" => Ok(Role::User),
            other => Err(DomainError::Internal(format!("unknown role {other:?}"))),
        }
    }
}

/// Moderator rank within a single forum.
///
/// Authorization is rank-insensitive: any moderator row passes the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeratorRank {
    Head,
    Member,
}

impl ModeratorRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeratorRank::Head => "Head",
            ModeratorRank::Member => "Member",
        }
    }
}

impl FromStr for ModeratorRank {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Head" => Ok(ModeratorRank::Head),
            "Member" => Ok(ModeratorRank::Member),
            other => Err(DomainError::Internal(format!("unknown moderator rank {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }
}

impl FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(UserStatus::Active),
            "Inactive" => Ok(UserStatus::Inactive),
            other => Err(DomainError::Internal(format!("unknown user status {other:?}"))),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// PHC-format password hash; never serialized out.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub profile_image: Option<String>,
    /// Numeric student id, unique among live accounts.
    pub student_id: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forum {
    pub id: i64,
    pub name: String,
    pub introduction: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A UserForum row. `is_removed = false` means active membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub user_id: i64,
    pub forum_id: i64,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moderator {
    pub id: i64,
    pub user_id: i64,
    pub forum_id: i64,
    pub rank: ModeratorRank,
    pub nickname: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub forum_id: i64,
    pub title: String,
    pub text: String,
    pub created_by: i64,
    /// Legacy counters kept on the row; detail views count vote rows instead.
    pub number_of_upvotes: i32,
    pub number_of_downvotes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub thread_id: i64,
    pub text: String,
    pub created_by: i64,
    pub number_of_upvotes: i32,
    pub number_of_downvotes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single up (`true`) or down (`false`) vote on a thread or reply.
///
/// At most one exists per (target, user); `target_id` is the thread id for
/// thread votes and the reply id for reply votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub target_id: i64,
    pub user_id: i64,
    pub vote: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The authenticated caller, decoded from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub student_id: Option<String>,
    pub role: Role,
}

// ── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub student_id: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewForum {
    pub name: String,
    pub introduction: String,
    pub category: Option<String>,
}

/// Field-level forum update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ForumPatch {
    pub name: Option<String>,
    pub introduction: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewModerator {
    pub forum_id: i64,
    pub user_id: i64,
    pub rank: ModeratorRank,
    pub nickname: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewThread {
    pub forum_id: i64,
    pub title: String,
    pub text: String,
    pub created_by: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadPatch {
    pub title: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub thread_id: i64,
    pub text: String,
    pub created_by: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ReplyPatch {
    pub text: Option<String>,
}

/// Optional forum search filters; both are substring matches.
#[derive(Debug, Clone, Default)]
pub struct ForumSearch {
    pub name: Option<String>,
    pub category: Option<String>,
}

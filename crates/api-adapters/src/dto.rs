//! Request bodies and query strings, with the structural checks that run
//! before a request reaches the services.
//!
//! Text fields default to empty so that a missing field and a blank one are
//! both reported as `ValidationFailed` rather than as a JSON error.

use domains::{DomainError, ForumPatch, ForumSearch, NewForum, ReplyPatch, Result, ThreadPatch};
use serde::Deserialize;
use services::Registration;

const MAX_STUDENT_ID_DIGITS: usize = 10;

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::ValidationFailed(msg.into())
}

fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} is required")));
    }
    Ok(())
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
        && !value.chars().any(char::is_whitespace)
}

/// Blank optional text means "leave unchanged".
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// An id that clients send either as a JSON number or as a numeric string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawId")]
pub struct IdField(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl From<RawId> for IdField {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Number(n) => IdField(n.to_string()),
            RawId::Text(s) => IdField(s.trim().to_string()),
        }
    }
}

impl From<&str> for IdField {
    fn from(value: &str) -> Self {
        IdField(value.trim().to_string())
    }
}

impl IdField {
    /// The raw digits, or `ValidationFailed` naming `field`.
    pub fn numeric(&self, field: &str) -> Result<&str> {
        if is_digits(&self.0) {
            Ok(&self.0)
        } else {
            Err(invalid(format!("{field} must be numeric")))
        }
    }

    pub fn parse(&self, field: &str) -> Result<i64> {
        self.numeric(field)?
            .parse()
            .map_err(|_| invalid(format!("{field} is out of range")))
    }
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "nim")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration> {
        let email = self.email.trim().to_string();
        required("email", &email)?;
        if !looks_like_email(&email) {
            return Err(invalid("email is not a valid email address"));
        }
        required("password", &self.password)?;

        let student_id = non_blank(self.student_id).map(|s| s.trim().to_string());
        if let Some(student_id) = student_id.as_deref() {
            if !is_digits(student_id) || student_id.len() > MAX_STUDENT_ID_DIGITS {
                return Err(invalid("student_id must be numeric with at most 10 digits"));
            }
        }

        Ok(Registration {
            name: non_blank(self.name).map(|n| n.trim().to_string()),
            email,
            student_id,
            password: self.password,
        })
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Email address or student id.
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        required("user", &self.user)?;
        required("password", &self.password)
    }
}

// ── Forums ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateForumRequest {
    #[serde(default)]
    pub forum_name: String,
    #[serde(default)]
    pub introduction_text: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl CreateForumRequest {
    pub fn validate(self) -> Result<NewForum> {
        required("forum_name", &self.forum_name)?;
        Ok(NewForum {
            name: self.forum_name.trim().to_string(),
            introduction: self.introduction_text,
            category: non_blank(self.category),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ForumIdRequest {
    #[serde(default)]
    pub forum_id: IdField,
}

#[derive(Debug, Deserialize)]
pub struct EditForumRequest {
    #[serde(default)]
    pub forum_id: IdField,
    #[serde(default)]
    pub forum_name: Option<String>,
    #[serde(default)]
    pub introduction_text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl EditForumRequest {
    pub fn validate(self) -> Result<(i64, ForumPatch)> {
        let forum_id = self.forum_id.parse("forum_id")?;
        Ok((
            forum_id,
            ForumPatch {
                name: non_blank(self.forum_name).map(|n| n.trim().to_string()),
                introduction: non_blank(self.introduction_text),
                image: non_blank(self.image),
                category: non_blank(self.category),
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberRequest {
    #[serde(default)]
    pub forum_id: IdField,
    #[serde(default)]
    pub user_id: IdField,
}

impl RemoveMemberRequest {
    pub fn validate(&self) -> Result<(i64, i64)> {
        Ok((self.forum_id.parse("forum_id")?, self.user_id.parse("user_id")?))
    }
}

#[derive(Debug, Deserialize)]
pub struct ForumIdQuery {
    #[serde(default)]
    pub forum_id: String,
}

impl ForumIdQuery {
    pub fn validate(&self) -> Result<i64> {
        IdField::from(self.forum_id.as_str()).parse("forum_id")
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<SearchQuery> for ForumSearch {
    fn from(query: SearchQuery) -> Self {
        ForumSearch {
            name: non_blank(query.name).map(|n| n.trim().to_string()),
            category: non_blank(query.category).map(|c| c.trim().to_string()),
        }
    }
}

// ── Threads and replies ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub forum_id: IdField,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl CreateThreadRequest {
    pub fn validate(&self) -> Result<String> {
        let forum_id = self.forum_id.numeric("forum_id")?.to_string();
        required("title", &self.title)?;
        required("text", &self.text)?;
        Ok(forum_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct ThreadVoteRequest {
    #[serde(default)]
    pub thread_id: IdField,
    #[serde(default)]
    pub vote: bool,
}

#[derive(Debug, Deserialize)]
pub struct EditThreadRequest {
    #[serde(default)]
    pub thread_id: IdField,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl EditThreadRequest {
    pub fn validate(self) -> Result<(String, ThreadPatch)> {
        let thread_id = self.thread_id.numeric("thread_id")?.to_string();
        Ok((
            thread_id,
            ThreadPatch {
                title: non_blank(self.title),
                text: non_blank(self.text),
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct ThreadIdRequest {
    #[serde(default)]
    pub thread_id: IdField,
}

#[derive(Debug, Deserialize)]
pub struct ThreadIdQuery {
    #[serde(default)]
    pub thread_id: String,
}

impl ThreadIdQuery {
    pub fn validate(&self) -> Result<&str> {
        if is_digits(self.thread_id.trim()) {
            Ok(self.thread_id.trim())
        } else {
            Err(invalid("thread_id must be numeric"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateReplyRequest {
    #[serde(default)]
    pub thread_id: IdField,
    #[serde(default)]
    pub text: String,
}

impl CreateReplyRequest {
    pub fn validate(&self) -> Result<String> {
        let thread_id = self.thread_id.numeric("thread_id")?.to_string();
        required("text", &self.text)?;
        Ok(thread_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplyVoteRequest {
    #[serde(default)]
    pub reply_id: IdField,
    #[serde(default)]
    pub vote: bool,
}

#[derive(Debug, Deserialize)]
pub struct EditReplyRequest {
    #[serde(default)]
    pub reply_id: IdField,
    #[serde(default)]
    pub text: Option<String>,
}

impl EditReplyRequest {
    pub fn validate(self) -> Result<(String, ReplyPatch)> {
        let reply_id = self.reply_id.numeric("reply_id")?.to_string();
        Ok((reply_id, ReplyPatch { text: non_blank(self.text) }))
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplyIdRequest {
    #[serde(default)]
    pub reply_id: IdField,
}

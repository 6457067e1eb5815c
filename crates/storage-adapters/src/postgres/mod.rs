//! # Postgres store
//!
//! Maps the relational schema in `migrations/` onto the domain models.
//! Every `PgTx` wraps one database transaction; uniqueness is enforced by
//! partial unique indexes and the violations are translated back into
//! domain errors by [`db_err`].

use async_trait::async_trait;
use domains::ports::{ForumRepo, Store, StoreTx, ThreadRepo, UserRepo};
use domains::{
    DomainError, Forum, ForumPatch, ForumSearch, ForumSearchHit, ForumThreadSummary, HomeThread,
    Membership, Moderator, NewForum, NewModerator, NewReply, NewThread, NewUser, Reply, ReplyField,
    ReplyPatch, Result, Thread, ThreadPatch, User, UserReply, UserThread, Vote, VoteTally,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{error, info};

/// Translates driver errors, mapping known constraint names onto the
/// matching domain error.
fn db_err(err: sqlx::Error) -> DomainError {
    let constraint = err
        .as_database_error()
        .and_then(|db| db.constraint())
        .map(str::to_owned);
    match constraint.as_deref() {
        Some("users_email_live") | Some("users_student_id_live") => {
            DomainError::AlreadyExists("user already exists".into())
        }
        Some("forums_name_live") => DomainError::AlreadyExists("forum name already exists".into()),
        Some("user_forums_active") => DomainError::AlreadyMember,
        _ => {
            error!(error = %err, "database error");
            DomainError::internal(err)
        }
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(DomainError::internal)?;
        info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(db_err)
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

const USER_COLS: &str = "id, name, email, password_hash, role, profile_image, student_id, \
                         status, created_at, updated_at";
const FORUM_COLS: &str = "id, name, introduction, image, category, created_at, updated_at";
const THREAD_COLS: &str = "t.id, t.forum_id, t.title, t.text, t.created_by, \
                           t.number_of_upvotes, t.number_of_downvotes, t.created_at, t.updated_at";
const REPLY_COLS: &str = "r.id, r.thread_id, r.text, r.created_by, \
                          r.number_of_upvotes, r.number_of_downvotes, r.created_at, r.updated_at";

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
        role: row.try_get::<String, _>("role").map_err(db_err)?.parse()?,
        profile_image: row.try_get("profile_image").map_err(db_err)?,
        student_id: row.try_get("student_id").map_err(db_err)?,
        status: row.try_get::<String, _>("status").map_err(db_err)?.parse()?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn forum_from_row(row: &PgRow) -> Result<Forum> {
    Ok(Forum {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        introduction: row.try_get("introduction").map_err(db_err)?,
        image: row.try_get("image").map_err(db_err)?,
        category: row.try_get("category").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn membership_from_row(row: &PgRow) -> Result<Membership> {
    Ok(Membership {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        forum_id: row.try_get("forum_id").map_err(db_err)?,
        is_removed: row.try_get("is_removed").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn moderator_from_row(row: &PgRow) -> Result<Moderator> {
    Ok(Moderator {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        forum_id: row.try_get("forum_id").map_err(db_err)?,
        rank: row.try_get::<String, _>("rank").map_err(db_err)?.parse()?,
        nickname: row.try_get("nickname").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn thread_from_row(row: &PgRow) -> Result<Thread> {
    Ok(Thread {
        id: row.try_get("id").map_err(db_err)?,
        forum_id: row.try_get("forum_id").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        text: row.try_get("text").map_err(db_err)?,
        created_by: row.try_get("created_by").map_err(db_err)?,
        number_of_upvotes: row.try_get("number_of_upvotes").map_err(db_err)?,
        number_of_downvotes: row.try_get("number_of_downvotes").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn reply_from_row(row: &PgRow) -> Result<Reply> {
    Ok(Reply {
        id: row.try_get("id").map_err(db_err)?,
        thread_id: row.try_get("thread_id").map_err(db_err)?,
        text: row.try_get("text").map_err(db_err)?,
        created_by: row.try_get("created_by").map_err(db_err)?,
        number_of_upvotes: row.try_get("number_of_upvotes").map_err(db_err)?,
        number_of_downvotes: row.try_get("number_of_downvotes").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn vote_from_row(row: &PgRow) -> Result<Vote> {
    Ok(Vote {
        id: row.try_get("id").map_err(db_err)?,
        target_id: row.try_get("target_id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        vote: row.try_get("vote").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn tally_from_row(row: &PgRow) -> Result<VoteTally> {
    Ok(VoteTally {
        total_upvotes: row.try_get("total_upvotes").map_err(db_err)?,
        total_downvotes: row.try_get("total_downvotes").map_err(db_err)?,
    })
}

fn collect<T>(rows: Vec<PgRow>, map: fn(&PgRow) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(map).collect()
}

// ── Users ────────────────────────────────────────────────────────────────────

impl PgTx {
    async fn find_user_where(&mut self, clause: &str, value: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLS} FROM users WHERE {clause} = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }
}

#[async_trait]
impl UserRepo for PgTx {
    async fn find_user_by_id(&mut self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        self.find_user_where("email", email).await
    }

    async fn find_user_by_student_id(&mut self, student_id: &str) -> Result<Option<User>> {
        self.find_user_where("student_id", student_id).await
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (name, email, student_id, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.name)
            .bind(user.email)
            .bind(user.student_id)
            .bind(user.password_hash)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        user_from_row(&row)
    }
}

// ── Forums, moderators, memberships ──────────────────────────────────────────

#[async_trait]
impl ForumRepo for PgTx {
    async fn find_forum_by_id(&mut self, id: i64) -> Result<Option<Forum>> {
        let sql = format!("SELECT {FORUM_COLS} FROM forums WHERE id = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.as_ref().map(forum_from_row).transpose()
    }

    async fn find_forum_by_name(&mut self, name: &str) -> Result<Option<Forum>> {
        let sql =
            format!("SELECT {FORUM_COLS} FROM forums WHERE name = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.as_ref().map(forum_from_row).transpose()
    }

    async fn insert_forum(&mut self, forum: NewForum) -> Result<Forum> {
        let sql = format!(
            "INSERT INTO forums (name, introduction, category) VALUES ($1, $2, $3) \
             RETURNING {FORUM_COLS}"
        );
        let row = sqlx::query(&sql)
            .bind(forum.name)
            .bind(forum.introduction)
            .bind(forum.category)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        forum_from_row(&row)
    }

    async fn update_forum(&mut self, id: i64, patch: &ForumPatch) -> Result<Forum> {
        let sql = format!(
            "UPDATE forums SET \
                 name = COALESCE($2, name), \
                 introduction = COALESCE($3, introduction), \
                 image = COALESCE($4, image), \
                 category = COALESCE($5, category), \
                 updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {FORUM_COLS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.introduction.as_deref())
            .bind(patch.image.as_deref())
            .bind(patch.category.as_deref())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => forum_from_row(&row),
            None => Err(DomainError::NotFound("forum")),
        }
    }

    async fn soft_delete_forum(&mut self, id: i64) -> Result<()> {
        sqlx::query("UPDATE forums SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_moderator(&mut self, forum_id: i64, user_id: i64) -> Result<Option<Moderator>> {
        let row = sqlx::query(
            "SELECT id, user_id, forum_id, rank, nickname, created_at FROM moderators \
             WHERE forum_id = $1 AND user_id = $2 AND deleted_at IS NULL \
             ORDER BY id LIMIT 1",
        )
        .bind(forum_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.as_ref().map(moderator_from_row).transpose()
    }

    async fn insert_moderator(&mut self, moderator: NewModerator) -> Result<Moderator> {
        let row = sqlx::query(
            "INSERT INTO moderators (user_id, forum_id, rank, nickname) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, forum_id, rank, nickname, created_at",
        )
        .bind(moderator.user_id)
        .bind(moderator.forum_id)
        .bind(moderator.rank.as_str())
        .bind(moderator.nickname)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        moderator_from_row(&row)
    }

    async fn find_active_membership(
        &mut self,
        forum_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>> {
        let row = sqlx::query(
            "SELECT id, user_id, forum_id, is_removed, created_at, updated_at FROM user_forums \
             WHERE forum_id = $1 AND user_id = $2 AND NOT is_removed AND deleted_at IS NULL \
             FOR SHARE",
        )
        .bind(forum_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.as_ref().map(membership_from_row).transpose()
    }

    async fn insert_membership(&mut self, forum_id: i64, user_id: i64) -> Result<Membership> {
        let row = sqlx::query(
            "INSERT INTO user_forums (user_id, forum_id) VALUES ($1, $2) \
             RETURNING id, user_id, forum_id, is_removed, created_at, updated_at",
        )
        .bind(user_id)
        .bind(forum_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        membership_from_row(&row)
    }

    async fn mark_membership_removed(&mut self, membership_id: i64) -> Result<()> {
        sqlx::query("UPDATE user_forums SET is_removed = TRUE, updated_at = now() WHERE id = $1")
            .bind(membership_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn count_active_members(&mut self, forum_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS members FROM user_forums \
             WHERE forum_id = $1 AND NOT is_removed AND deleted_at IS NULL",
        )
        .bind(forum_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        row.try_get("members").map_err(db_err)
    }

    async fn list_member_forums(&mut self, user_id: i64) -> Result<Vec<Forum>> {
        let rows = sqlx::query(
            "SELECT f.id, f.name, f.introduction, f.image, f.category, f.created_at, f.updated_at \
             FROM forums f JOIN user_forums uf ON uf.forum_id = f.id \
             WHERE uf.user_id = $1 AND NOT uf.is_removed AND uf.deleted_at IS NULL \
               AND f.deleted_at IS NULL \
             ORDER BY f.id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        collect(rows, forum_from_row)
    }

    async fn list_unjoined_forums(&mut self, user_id: i64) -> Result<Vec<Forum>> {
        let sql = format!(
            "SELECT {FORUM_COLS} FROM forums f WHERE f.deleted_at IS NULL AND NOT EXISTS ( \
                 SELECT 1 FROM user_forums uf WHERE uf.forum_id = f.id AND uf.user_id = $1 \
                   AND NOT uf.is_removed AND uf.deleted_at IS NULL) \
             ORDER BY f.id"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        collect(rows, forum_from_row)
    }

    async fn search_forums(&mut self, search: &ForumSearch) -> Result<Vec<ForumSearchHit>> {
        let rows = sqlx::query(
            "SELECT id, name, image, category FROM forums WHERE deleted_at IS NULL \
               AND ($1::text IS NULL OR strpos(lower(name), lower($1)) > 0) \
               AND ($2::text IS NULL OR strpos(lower(COALESCE(category, '')), lower($2)) > 0 \
                    AND category IS NOT NULL) \
             ORDER BY name",
        )
        .bind(search.name.as_deref())
        .bind(search.category.as_deref())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                Ok(ForumSearchHit {
                    id: row.try_get("id").map_err(db_err)?,
                    forum_name: row.try_get("name").map_err(db_err)?,
                    forum_image: row.try_get("image").map_err(db_err)?,
                    category: row.try_get("category").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn list_forum_threads(&mut self, forum_id: i64) -> Result<Vec<ForumThreadSummary>> {
        let rows = sqlx::query(
            "SELECT t.id, t.title, t.text, t.created_at, \
                    COALESCE(u.name, '') AS author, u.profile_image AS author_image \
             FROM threads t LEFT JOIN users u ON u.id = t.created_by AND u.deleted_at IS NULL \
             WHERE t.forum_id = $1 AND t.deleted_at IS NULL \
             ORDER BY t.id DESC",
        )
        .bind(forum_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                Ok(ForumThreadSummary {
                    id: row.try_get("id").map_err(db_err)?,
                    title: row.try_get("title").map_err(db_err)?,
                    text: row.try_get("text").map_err(db_err)?,
                    created_by: row.try_get("author").map_err(db_err)?,
                    created_by_image: row.try_get("author_image").map_err(db_err)?,
                    created_at: row.try_get("created_at").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn list_home_threads(&mut self, user_id: i64) -> Result<Vec<HomeThread>> {
        let rows = sqlx::query(
            "SELECT f.id AS forum_id, f.name AS forum_name, f.image AS forum_image, \
                    t.id AS thread_id, t.title, t.text, t.created_at, \
                    COALESCE(u.name, '') AS author \
             FROM threads t \
             JOIN forums f ON f.id = t.forum_id AND f.deleted_at IS NULL \
             JOIN user_forums uf ON uf.forum_id = f.id AND uf.user_id = $1 \
                  AND NOT uf.is_removed AND uf.deleted_at IS NULL \
             LEFT JOIN users u ON u.id = t.created_by AND u.deleted_at IS NULL \
             WHERE t.deleted_at IS NULL \
             ORDER BY t.id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                Ok(HomeThread {
                    forum_id: row.try_get("forum_id").map_err(db_err)?,
                    forum_name: row.try_get("forum_name").map_err(db_err)?,
                    forum_image: row.try_get("forum_image").map_err(db_err)?,
                    thread_id: row.try_get("thread_id").map_err(db_err)?,
                    title: row.try_get("title").map_err(db_err)?,
                    text: row.try_get("text").map_err(db_err)?,
                    created_by: row.try_get("author").map_err(db_err)?,
                    created_at: row.try_get("created_at").map_err(db_err)?,
                })
            })
            .collect()
    }
}

// ── Threads, replies, votes ──────────────────────────────────────────────────

#[async_trait]
impl ThreadRepo for PgTx {
    async fn find_thread(&mut self, id: i64) -> Result<Option<Thread>> {
        let sql = format!(
            "SELECT {THREAD_COLS} FROM threads t \
             JOIN forums f ON f.id = t.forum_id AND f.deleted_at IS NULL \
             WHERE t.id = $1 AND t.deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.as_ref().map(thread_from_row).transpose()
    }

    async fn insert_thread(&mut self, thread: NewThread) -> Result<Thread> {
        let row = sqlx::query(
            "INSERT INTO threads (forum_id, title, text, created_by) VALUES ($1, $2, $3, $4) \
             RETURNING id, forum_id, title, text, created_by, number_of_upvotes, \
                       number_of_downvotes, created_at, updated_at",
        )
        .bind(thread.forum_id)
        .bind(thread.title)
        .bind(thread.text)
        .bind(thread.created_by)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        thread_from_row(&row)
    }

    async fn update_thread(&mut self, id: i64, patch: &ThreadPatch) -> Result<Thread> {
        let row = sqlx::query(
            "UPDATE threads SET title = COALESCE($2, title), text = COALESCE($3, text), \
                 updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id, forum_id, title, text, created_by, number_of_upvotes, \
                       number_of_downvotes, created_at, updated_at",
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.text.as_deref())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        match row {
            Some(row) => thread_from_row(&row),
            None => Err(DomainError::NotFound("thread")),
        }
    }

    async fn soft_delete_thread(&mut self, id: i64) -> Result<()> {
        sqlx::query("UPDATE threads SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn upsert_thread_vote(
        &mut self,
        thread_id: i64,
        user_id: i64,
        vote: bool,
    ) -> Result<Vote> {
        let row = sqlx::query(
            "INSERT INTO thread_votes (thread_id, user_id, vote) VALUES ($1, $2, $3) \
             ON CONFLICT (thread_id, user_id) DO UPDATE \
                 SET vote = EXCLUDED.vote, updated_at = now(), deleted_at = NULL \
             RETURNING id, thread_id AS target_id, user_id, vote, created_at, updated_at",
        )
        .bind(thread_id)
        .bind(user_id)
        .bind(vote)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        vote_from_row(&row)
    }

    async fn thread_vote_tally(&mut self, thread_id: i64) -> Result<VoteTally> {
        let row = sqlx::query(
            "SELECT COUNT(*) FILTER (WHERE vote) AS total_upvotes, \
                    COUNT(*) FILTER (WHERE NOT vote) AS total_downvotes \
             FROM thread_votes WHERE thread_id = $1 AND deleted_at IS NULL",
        )
        .bind(thread_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        tally_from_row(&row)
    }

    async fn list_threads_by_creator(&mut self, user_id: i64) -> Result<Vec<UserThread>> {
        let sql = format!(
            "SELECT {THREAD_COLS}, f.name AS forum_name, f.image AS forum_image \
             FROM threads t JOIN forums f ON f.id = t.forum_id AND f.deleted_at IS NULL \
             WHERE t.created_by = $1 AND t.deleted_at IS NULL \
             ORDER BY t.id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                Ok(UserThread {
                    thread: thread_from_row(row)?,
                    forum_name: row.try_get("forum_name").map_err(db_err)?,
                    forum_image: row.try_get("forum_image").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn find_reply(&mut self, id: i64) -> Result<Option<Reply>> {
        let sql = format!(
            "SELECT {REPLY_COLS} FROM replies r \
             JOIN threads t ON t.id = r.thread_id AND t.deleted_at IS NULL \
             JOIN forums f ON f.id = t.forum_id AND f.deleted_at IS NULL \
             WHERE r.id = $1 AND r.deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;
        row.as_ref().map(reply_from_row).transpose()
    }

    async fn insert_reply(&mut self, reply: NewReply) -> Result<Reply> {
        let row = sqlx::query(
            "INSERT INTO replies (thread_id, text, created_by) VALUES ($1, $2, $3) \
             RETURNING id, thread_id, text, created_by, number_of_upvotes, \
                       number_of_downvotes, created_at, updated_at",
        )
        .bind(reply.thread_id)
        .bind(reply.text)
        .bind(reply.created_by)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        reply_from_row(&row)
    }

    async fn update_reply(&mut self, id: i64, patch: &ReplyPatch) -> Result<Reply> {
        let row = sqlx::query(
            "UPDATE replies SET text = COALESCE($2, text), updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id, thread_id, text, created_by, number_of_upvotes, \
                       number_of_downvotes, created_at, updated_at",
        )
        .bind(id)
        .bind(patch.text.as_deref())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;
        match row {
            Some(row) => reply_from_row(&row),
            None => Err(DomainError::NotFound("reply")),
        }
    }

    async fn soft_delete_reply(&mut self, id: i64) -> Result<()> {
        sqlx::query("UPDATE replies SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn upsert_reply_vote(&mut self, reply_id: i64, user_id: i64, vote: bool) -> Result<Vote> {
        let row = sqlx::query(
            "INSERT INTO reply_votes (reply_id, user_id, vote) VALUES ($1, $2, $3) \
             ON CONFLICT (reply_id, user_id) DO UPDATE \
                 SET vote = EXCLUDED.vote, updated_at = now(), deleted_at = NULL \
             RETURNING id, reply_id AS target_id, user_id, vote, created_at, updated_at",
        )
        .bind(reply_id)
        .bind(user_id)
        .bind(vote)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        vote_from_row(&row)
    }

    async fn list_reply_fields(&mut self, thread_id: i64) -> Result<Vec<ReplyField>> {
        let rows = sqlx::query(
            "SELECT r.id, r.text, r.created_at, COALESCE(u.name, '') AS author, \
                    COUNT(v.id) FILTER (WHERE v.vote) AS total_upvotes, \
                    COUNT(v.id) FILTER (WHERE NOT v.vote) AS total_downvotes \
             FROM replies r \
             LEFT JOIN users u ON u.id = r.created_by AND u.deleted_at IS NULL \
             LEFT JOIN reply_votes v ON v.reply_id = r.id AND v.deleted_at IS NULL \
             WHERE r.thread_id = $1 AND r.deleted_at IS NULL \
             GROUP BY r.id, u.name \
             ORDER BY r.id",
        )
        .bind(thread_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                Ok(ReplyField {
                    id: row.try_get("id").map_err(db_err)?,
                    text: row.try_get("text").map_err(db_err)?,
                    created_by: row.try_get("author").map_err(db_err)?,
                    created_at: row.try_get("created_at").map_err(db_err)?,
                    votes: tally_from_row(row)?,
                })
            })
            .collect()
    }

    async fn list_replies_by_creator(&mut self, user_id: i64) -> Result<Vec<UserReply>> {
        let rows = sqlx::query(
            "SELECT r.id AS reply_id, r.thread_id, r.text AS reply_text, r.created_by AS reply_by, \
                    r.number_of_upvotes AS reply_up, r.number_of_downvotes AS reply_down, \
                    r.created_at AS reply_created_at, r.updated_at AS reply_updated_at, \
                    t.id, t.forum_id, t.title, t.text, t.created_by, t.number_of_upvotes, \
                    t.number_of_downvotes, t.created_at, t.updated_at, \
                    f.name AS forum_name, f.image AS forum_image \
             FROM replies r \
             JOIN threads t ON t.id = r.thread_id AND t.deleted_at IS NULL \
             JOIN forums f ON f.id = t.forum_id AND f.deleted_at IS NULL \
             WHERE r.created_by = $1 AND r.deleted_at IS NULL \
             ORDER BY r.id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                Ok(UserReply {
                    thread: thread_from_row(row)?,
                    reply: Reply {
                        id: row.try_get("reply_id").map_err(db_err)?,
                        thread_id: row.try_get("thread_id").map_err(db_err)?,
                        text: row.try_get("reply_text").map_err(db_err)?,
                        created_by: row.try_get("reply_by").map_err(db_err)?,
                        number_of_upvotes: row.try_get("reply_up").map_err(db_err)?,
                        number_of_downvotes: row.try_get("reply_down").map_err(db_err)?,
                        created_at: row.try_get("reply_created_at").map_err(db_err)?,
                        updated_at: row.try_get("reply_updated_at").map_err(db_err)?,
                    },
                    forum_name: row.try_get("forum_name").map_err(db_err)?,
                    forum_image: row.try_get("forum_image").map_err(db_err)?,
                })
            })
            .collect()
    }
}

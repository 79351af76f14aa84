//! Postgres-backed board store.
//!
//! ## Schema
//!
//! Foreign keys are declared without `ON DELETE CASCADE`: cascades are the
//! coordinator's job and run as explicit steps inside one transaction, so a
//! step executed in the wrong order fails instead of silently deleting rows.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` (email index) |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / network / decode | N/A | `Backend` |
//!
//! ## Timestamps
//!
//! `modified_at` is advanced in SQL with
//! `GREATEST(clock_timestamp(), modified_at + interval '1 microsecond')`, so it
//! strictly increases per row even across clock skew.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use scheduler_auth::{CredentialStore, NewUser, PasswordHash, User};
use scheduler_board::{Comment, NewComment, NewSchedule, Page, PageRequest, Schedule, ScheduleSummary};
use scheduler_core::{CommentId, DomainResult, Resource, ScheduleId, Timestamps, UserId};

use super::{BoardStore, BoardTx, StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        name          TEXT NOT NULL,
        email         TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL,
        modified_at   TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email)",
    r#"
    CREATE TABLE IF NOT EXISTS schedules (
        id          UUID PRIMARY KEY,
        owner_id    UUID NOT NULL REFERENCES users (id),
        title       TEXT NOT NULL,
        content     TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        modified_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS schedules_owner_idx ON schedules (owner_id, modified_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id          UUID PRIMARY KEY,
        owner_id    UUID NOT NULL REFERENCES users (id),
        schedule_id UUID NOT NULL REFERENCES schedules (id),
        content     TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        modified_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS comments_schedule_idx ON comments (schedule_id, modified_at DESC)",
    "CREATE INDEX IF NOT EXISTS comments_owner_idx ON comments (owner_id)",
];

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, modified_at";
const SCHEDULE_COLUMNS: &str = "id, owner_id, title, content, created_at, modified_at";
const COMMENT_COLUMNS: &str = "id, owner_id, schedule_id, content, created_at, modified_at";
const TOUCH: &str = "modified_at = GREATEST(clock_timestamp(), modified_at + interval '1 microsecond')";

/// Postgres-backed board store.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; units of work hold
/// one pooled connection inside a `sqlx::Transaction`.
#[derive(Debug, Clone)]
pub struct PostgresBoardStore {
    pool: Arc<PgPool>,
}

impl PostgresBoardStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool and make sure the schema exists.
    #[instrument(skip(url), err)]
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if missing.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tracing::info!("board schema ready");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresBoardStore {
    async fn find_user(&self, id: UserId) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn email_exists(&self, email: &str) -> DomainResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("email_exists", e))?;
        Ok(exists)
    }
}

#[async_trait]
impl BoardStore for PostgresBoardStore {
    #[instrument(skip(self), err)]
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY modified_at DESC, id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, new), fields(user_id = %new.id), err)]
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*new.id.as_uuid())
            .bind(&new.name)
            .bind(&new.email)
            .bind(new.password_hash.as_str())
            .bind(Utc::now())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_write_error("insert_user", e, &new.email))?;
        user_from_row(&row)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: User) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, {TOUCH} \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*user.id.as_uuid())
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.password_hash.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_write_error("update_user", e, &user.email))?
            .ok_or(StoreError::NotFound(Resource::User))?;
        user_from_row(&row)
    }

    async fn find_schedule(&self, id: ScheduleId) -> StoreResult<Option<Schedule>> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_schedule", e))?;
        row.as_ref().map(schedule_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_schedules(&self, request: PageRequest) -> StoreResult<Page<ScheduleSummary>> {
        let owner = request.user_id.map(|id| *id.as_uuid());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM schedules WHERE ($1::uuid IS NULL OR owner_id = $1)",
        )
        .bind(owner)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_schedules", e))?;

        let rows = sqlx::query(
            r#"
            SELECT
                s.id, s.owner_id, u.name AS user_name, s.title, s.content,
                s.created_at, s.modified_at,
                (SELECT COUNT(*) FROM comments c WHERE c.schedule_id = s.id) AS comment_count
            FROM schedules s
            JOIN users u ON u.id = s.owner_id
            WHERE ($1::uuid IS NULL OR s.owner_id = $1)
            ORDER BY s.modified_at DESC, s.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner)
        .bind(request.limit() as i64)
        .bind(request.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_schedules", e))?;

        let items = rows
            .iter()
            .map(summary_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, &request, total.max(0) as u64))
    }

    #[instrument(skip(self, new), fields(schedule_id = %new.id, owner_id = %new.owner_id), err)]
    async fn insert_schedule(&self, new: NewSchedule) -> StoreResult<Schedule> {
        let sql = format!(
            "INSERT INTO schedules ({SCHEDULE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {SCHEDULE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*new.id.as_uuid())
            .bind(*new.owner_id.as_uuid())
            .bind(&new.title)
            .bind(&new.content)
            .bind(Utc::now())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_schedule", e))?;
        schedule_from_row(&row)
    }

    #[instrument(skip(self, schedule), fields(schedule_id = %schedule.id), err)]
    async fn update_schedule(&self, schedule: Schedule) -> StoreResult<Schedule> {
        let sql = format!(
            "UPDATE schedules SET title = $2, content = $3, {TOUCH} \
             WHERE id = $1 RETURNING {SCHEDULE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*schedule.id.as_uuid())
            .bind(&schedule.title)
            .bind(&schedule.content)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_schedule", e))?
            .ok_or(StoreError::NotFound(Resource::Schedule))?;
        schedule_from_row(&row)
    }

    async fn find_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_comment", e))?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn list_comments(&self, schedule_id: ScheduleId) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE schedule_id = $1 \
             ORDER BY modified_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(*schedule_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_comments", e))?;
        rows.iter().map(comment_from_row).collect()
    }

    #[instrument(skip(self, new), fields(comment_id = %new.id, schedule_id = %new.schedule_id), err)]
    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let sql = format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*new.id.as_uuid())
            .bind(*new.owner_id.as_uuid())
            .bind(*new.schedule_id.as_uuid())
            .bind(&new.content)
            .bind(Utc::now())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_comment", e))?;
        comment_from_row(&row)
    }

    #[instrument(skip(self, comment), fields(comment_id = %comment.id), err)]
    async fn update_comment(&self, comment: Comment) -> StoreResult<Comment> {
        let sql = format!(
            "UPDATE comments SET content = $2, {TOUCH} WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(*comment.id.as_uuid())
            .bind(&comment.content)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_comment", e))?
            .ok_or(StoreError::NotFound(Resource::Comment))?;
        comment_from_row(&row)
    }

    async fn delete_comment(&self, id: CommentId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_comment", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn begin(&self) -> StoreResult<Box<dyn BoardTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

/// Unit of work over one `sqlx::Transaction`; dropping it rolls back.
struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTx {
    async fn delete(&mut self, operation: &str, sql: &str, id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(sql)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BoardTx for PostgresTx {
    async fn delete_comments_by_owner(&mut self, owner_id: UserId) -> StoreResult<u64> {
        self.delete(
            "delete_comments_by_owner",
            "DELETE FROM comments WHERE owner_id = $1",
            *owner_id.as_uuid(),
        )
        .await
    }

    async fn delete_comments_under_schedules_of(&mut self, owner_id: UserId) -> StoreResult<u64> {
        self.delete(
            "delete_comments_under_schedules_of",
            "DELETE FROM comments WHERE schedule_id IN (SELECT id FROM schedules WHERE owner_id = $1)",
            *owner_id.as_uuid(),
        )
        .await
    }

    async fn delete_comments_by_schedule(&mut self, schedule_id: ScheduleId) -> StoreResult<u64> {
        self.delete(
            "delete_comments_by_schedule",
            "DELETE FROM comments WHERE schedule_id = $1",
            *schedule_id.as_uuid(),
        )
        .await
    }

    async fn delete_schedules_by_owner(&mut self, owner_id: UserId) -> StoreResult<u64> {
        self.delete(
            "delete_schedules_by_owner",
            "DELETE FROM schedules WHERE owner_id = $1",
            *owner_id.as_uuid(),
        )
        .await
    }

    async fn delete_schedule(&mut self, id: ScheduleId) -> StoreResult<bool> {
        let n = self
            .delete("delete_schedule", "DELETE FROM schedules WHERE id = $1", *id.as_uuid())
            .await?;
        Ok(n > 0)
    }

    async fn delete_user(&mut self, id: UserId) -> StoreResult<bool> {
        let n = self
            .delete("delete_user", "DELETE FROM users WHERE id = $1", *id.as_uuid())
            .await?;
        Ok(n > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn timestamps_from_row(row: &PgRow) -> Result<Timestamps, sqlx::Error> {
    Ok(Timestamps {
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        modified_at: row.try_get::<DateTime<Utc>, _>("modified_at")?,
    })
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let decode = || -> Result<User, sqlx::Error> {
        Ok(User {
            id: UserId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: PasswordHash::from_phc(row.try_get::<String, _>("password_hash")?),
            timestamps: timestamps_from_row(row)?,
        })
    };
    decode().map_err(|e| map_sqlx_error("decode_user", e))
}

fn schedule_from_row(row: &PgRow) -> StoreResult<Schedule> {
    let decode = || -> Result<Schedule, sqlx::Error> {
        Ok(Schedule {
            id: ScheduleId::from_uuid(row.try_get("id")?),
            owner_id: UserId::from_uuid(row.try_get("owner_id")?),
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            timestamps: timestamps_from_row(row)?,
        })
    };
    decode().map_err(|e| map_sqlx_error("decode_schedule", e))
}

fn summary_from_row(row: &PgRow) -> StoreResult<ScheduleSummary> {
    let decode = || -> Result<ScheduleSummary, sqlx::Error> {
        Ok(ScheduleSummary {
            id: ScheduleId::from_uuid(row.try_get("id")?),
            owner_id: UserId::from_uuid(row.try_get("owner_id")?),
            user_name: row.try_get("user_name")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            comment_count: row.try_get::<i64, _>("comment_count")?.max(0) as u64,
            created_at: row.try_get("created_at")?,
            modified_at: row.try_get("modified_at")?,
        })
    };
    decode().map_err(|e| map_sqlx_error("decode_schedule_summary", e))
}

fn comment_from_row(row: &PgRow) -> StoreResult<Comment> {
    let decode = || -> Result<Comment, sqlx::Error> {
        Ok(Comment {
            id: CommentId::from_uuid(row.try_get("id")?),
            owner_id: UserId::from_uuid(row.try_get("owner_id")?),
            schedule_id: ScheduleId::from_uuid(row.try_get("schedule_id")?),
            content: row.try_get("content")?,
            timestamps: timestamps_from_row(row)?,
        })
    };
    decode().map_err(|e| map_sqlx_error("decode_comment", e))
}

/// Like [`map_sqlx_error`], but attributes unique violations to `email`.
fn map_write_error(operation: &str, err: sqlx::Error, email: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::UniqueViolation {
            email: email.to_string(),
        }
    } else {
        map_sqlx_error(operation, err)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_never_cascades() {
        for statement in SCHEMA {
            assert!(!statement.to_uppercase().contains("ON DELETE CASCADE"));
        }
    }

    #[test]
    fn non_database_errors_map_to_backend() {
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::PoolClosed),
            StoreError::Backend(_)
        ));
        assert!(matches!(
            map_write_error("op", sqlx::Error::RowNotFound, "a@x.com"),
            StoreError::Backend(_)
        ));
    }
}

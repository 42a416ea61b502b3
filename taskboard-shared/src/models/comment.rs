/// Comment model and database operations
///
/// Comments form an append-only thread per task. They are never edited or
/// deleted individually; deleting a task removes its thread via cascade.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id TEXT NOT NULL,
///     comment TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Comment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,

    /// Task this comment belongs to
    pub task_id: Uuid,

    /// Author identifier (email)
    pub user_id: String,

    /// Comment text
    pub comment: String,

    pub created_at: DateTime<Utc>,
}

/// Comment joined with the title of its task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentWithTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: Comment,

    /// `None` if the task row is gone
    pub task_title: Option<String>,
}

/// Input for posting a comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub task_id: Uuid,
    pub user_id: String,
    pub comment: String,
}

impl Comment {
    /// Appends a comment to a task thread
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation if the task does not exist
    pub async fn create(pool: &PgPool, data: NewComment) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, user_id, comment)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, user_id, comment, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.comment)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Lists a task's thread, oldest first
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, user_id, comment, created_at
            FROM comments
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Most recent comments across a set of tasks, newest first
    pub async fn recent_for_tasks(
        pool: &PgPool,
        task_ids: &[Uuid],
        limit: i64,
    ) -> Result<Vec<CommentWithTask>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let comments = sqlx::query_as::<_, CommentWithTask>(
            r#"
            SELECT c.id, c.task_id, c.user_id, c.comment, c.created_at,
                   t.title AS task_title
            FROM comments c
            LEFT JOIN tasks t ON t.id = c.task_id
            WHERE c.task_id = ANY($1)
            ORDER BY c.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(task_ids)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }
}

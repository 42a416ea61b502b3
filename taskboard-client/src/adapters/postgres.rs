/// PostgreSQL store
///
/// [`PgStore`] runs the model queries from `taskboard-shared` and, when a
/// [`ChangeWriter`] is attached, publishes a change event after every
/// successful mutation. A failed publish is logged; the write itself stands.
///
/// # Example
///
/// ```no_run
/// use taskboard_client::adapters::PgStore;
/// use taskboard_client::store::RemoteStore;
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::models::task::TaskQuery;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgStore::new(pool);
///
/// let mine = store.tasks(&TaskQuery::involving("ana@example.com")).await?;
/// # Ok(())
/// # }
/// ```

use crate::auth::{AuthError, CredentialStore};
use crate::error::{StoreError, StoreResult};
use crate::store::RemoteStore;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use taskboard_shared::events::{ChangeEvent, ChangeKind, Table};
use taskboard_shared::models::comment::{Comment, CommentWithTask, NewComment};
use taskboard_shared::models::identity::AuthIdentity;
use taskboard_shared::models::task::{AssignedTask, NewTask, Task, TaskPatch, TaskQuery};
use taskboard_shared::models::user::User;
use taskboard_shared::redis::ChangeWriter;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    writer: Option<ChangeWriter>,
}

impl PgStore {
    /// Store without change publishing
    pub fn new(pool: PgPool) -> Self {
        Self { pool, writer: None }
    }

    /// Store that publishes every mutation to `writer`
    pub fn with_writer(pool: PgPool, writer: ChangeWriter) -> Self {
        Self {
            pool,
            writer: Some(writer),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn publish<T: Serialize>(&self, table: Table, kind: ChangeKind, row: &T) {
        let Some(writer) = &self.writer else {
            return;
        };

        let event = match ChangeEvent::for_row(table, kind, row) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Failed to encode change event");
                return;
            }
        };

        if let Err(e) = writer.publish(&event).await {
            tracing::warn!(
                table = %table,
                kind = %kind,
                error = %e,
                "Failed to publish change event"
            );
        }
    }
}

#[async_trait]
impl RemoteStore for PgStore {
    async fn tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        Ok(Task::list(&self.pool, query).await?)
    }

    async fn tasks_with_assignee(&self, query: &TaskQuery) -> StoreResult<Vec<AssignedTask>> {
        Ok(Task::list_with_assignee(&self.pool, query).await?)
    }

    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        let task = Task::create(&self.pool, task).await?;
        tracing::info!(task_id = %task.id, assigned_to = %task.assigned_to, "Created task");

        self.publish(Table::Tasks, ChangeKind::Insert, &task).await;
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> StoreResult<Task> {
        let task = Task::update(&self.pool, id, patch)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "task",
                id: id.to_string(),
            })?;
        tracing::debug!(task_id = %id, status = %task.status, "Updated task");

        self.publish(Table::Tasks, ChangeKind::Update, &task).await;
        Ok(task)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        if !Task::delete(&self.pool, id).await? {
            return Err(StoreError::NotFound {
                entity: "task",
                id: id.to_string(),
            });
        }
        tracing::info!(task_id = %id, "Deleted task");

        self.publish(Table::Tasks, ChangeKind::Delete, &json!({ "id": id }))
            .await;
        Ok(())
    }

    async fn comments_for_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        Ok(Comment::list_for_task(&self.pool, task_id).await?)
    }

    async fn recent_comments(&self, task_ids: &[Uuid], limit: i64) -> StoreResult<Vec<CommentWithTask>> {
        Ok(Comment::recent_for_tasks(&self.pool, task_ids, limit).await?)
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let comment = Comment::create(&self.pool, comment).await?;
        tracing::debug!(task_id = %comment.task_id, comment_id = %comment.id, "Added comment");

        self.publish(Table::Comments, ChangeKind::Insert, &comment).await;
        Ok(comment)
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn users_by_email(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        Ok(User::find_by_emails(&self.pool, emails).await?)
    }

    async fn search_users(&self, term: &str, limit: i64) -> StoreResult<Vec<User>> {
        Ok(User::search(&self.pool, term, limit).await?)
    }

    async fn upsert_profile(&self, id: Uuid, email: &str) -> StoreResult<User> {
        let user = User::upsert_profile(&self.pool, id, email).await?;

        self.publish(Table::Users, ChangeKind::Update, &user).await;
        Ok(user)
    }

    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<User> {
        let user = User::update_name(&self.pool, id, name)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: id.to_string(),
            })?;

        self.publish(Table::Users, ChangeKind::Update, &user).await;
        Ok(user)
    }
}

/// Credentials in the `auth_identities` table
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find(&self, email: &str) -> Result<Option<AuthIdentity>, AuthError> {
        AuthIdentity::find_by_email(&self.pool, email)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<AuthIdentity, AuthError> {
        AuthIdentity::create(&self.pool, email, password_hash)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::AlreadyRegistered,
                other => AuthError::Backend(other.to_string()),
            })
    }
}

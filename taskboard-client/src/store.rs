/// Remote store contract
///
/// Everything the views read or write goes through [`RemoteStore`]. The
/// PostgreSQL adapter runs the model queries from `taskboard-shared`; the
/// in-memory adapter mirrors the same semantics for tests and demos.
///
/// Joined reads (`tasks_with_assignee`) may fail independently of plain
/// reads; callers fall back to `tasks` when they do.

use crate::error::StoreResult;
use async_trait::async_trait;
use taskboard_shared::models::comment::{Comment, CommentWithTask, NewComment};
use taskboard_shared::models::task::{AssignedTask, NewTask, Task, TaskPatch, TaskQuery};
use taskboard_shared::models::user::User;
use uuid::Uuid;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Tasks matching `query`, ordered and limited as it says
    async fn tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    /// Same as [`RemoteStore::tasks`], joined with the assignee's name
    async fn tasks_with_assignee(&self, query: &TaskQuery) -> StoreResult<Vec<AssignedTask>>;

    /// Inserts a task in the `To Do` column
    async fn insert_task(&self, task: NewTask) -> StoreResult<Task>;

    /// Applies a partial update, `NotFound` if the task is gone
    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> StoreResult<Task>;

    /// Deletes a task and, through the cascade, its comments
    async fn delete_task(&self, id: Uuid) -> StoreResult<()>;

    /// Thread for one task, oldest first
    async fn comments_for_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Newest comments across `task_ids`, joined with the task title
    async fn recent_comments(&self, task_ids: &[Uuid], limit: i64) -> StoreResult<Vec<CommentWithTask>>;

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn users_by_email(&self, emails: &[String]) -> StoreResult<Vec<User>>;

    /// Users whose name or email contains `term`, case-insensitively
    async fn search_users(&self, term: &str, limit: i64) -> StoreResult<Vec<User>>;

    /// Creates or refreshes a profile without touching a chosen name
    async fn upsert_profile(&self, id: Uuid, email: &str) -> StoreResult<User>;

    /// Sets the display name, `NotFound` if there is no profile
    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<User>;
}

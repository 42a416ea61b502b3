/// Database models for Taskboard
///
/// # Models
///
/// - `task`: Board cards, their status/priority labels, and listing filters
/// - `user`: Profile rows with display names
/// - `comment`: Append-only per-task threads
/// - `identity`: Credentials behind sign-in
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::comment::{Comment, NewComment};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(task_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// Comment::create(&pool, NewComment {
///     task_id,
///     user_id: "ana@example.com".to_string(),
///     comment: "Looks good".to_string(),
/// }).await?;
///
/// let thread = Comment::list_for_task(&pool, task_id).await?;
/// # Ok(())
/// # }
/// ```

pub mod comment;
pub mod identity;
pub mod task;
pub mod user;

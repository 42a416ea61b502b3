/// Task model and database operations
///
/// Tasks are the cards on the board. A task moves between three status
/// columns and carries a priority used for ordering.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status TEXT NOT NULL DEFAULT 'To Do',
///     priority TEXT NOT NULL DEFAULT 'Medium',
///     assigned_to TEXT NOT NULL,
///     created_by TEXT NOT NULL,
///     due_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `assigned_to` and `created_by` hold user identifiers (email addresses).
/// They are matched against `users.email` when a display name is joined in.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{NewTask, Priority, Task, TaskQuery};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, NewTask {
///     title: "Write release notes".to_string(),
///     description: String::new(),
///     priority: Priority::High,
///     assigned_to: "ana@example.com".to_string(),
///     created_by: "ana@example.com".to_string(),
///     due_date: None,
/// }).await?;
///
/// let mine = Task::list(&pool, &TaskQuery::involving("ana@example.com")).await?;
/// assert!(mine.iter().any(|t| t.id == task.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a stored status or priority string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} value: {value:?}")]
pub struct ParseLabelError {
    /// Which label was being parsed ("status" or "priority")
    pub kind: &'static str,

    /// The rejected value
    pub value: String,
}

/// Board column a task sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started
    #[serde(rename = "To Do")]
    ToDo,

    /// Being worked on
    #[serde(rename = "In Progress")]
    InProgress,

    /// Finished
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// All statuses in board column order
    pub const ALL: [TaskStatus; 3] = [TaskStatus::ToDo, TaskStatus::InProgress, TaskStatus::Done];

    /// Converts status to its stored label
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// Parses a stored label
    pub fn parse(value: &str) -> Result<Self, ParseLabelError> {
        match value {
            "To Do" => Ok(TaskStatus::ToDo),
            "In Progress" => Ok(TaskStatus::InProgress),
            "Done" => Ok(TaskStatus::Done),
            other => Err(ParseLabelError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }

    /// Whether the task is still open
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = ParseLabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaskStatus::parse(&value)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// All priorities, lowest first
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Converts priority to its stored label
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Parses a stored label
    pub fn parse(value: &str) -> Result<Self, ParseLabelError> {
        match value {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            other => Err(ParseLabelError {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Priority {
    type Error = ParseLabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Priority::parse(&value)
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Short title shown on the card
    pub title: String,

    /// Free-form description (may be empty)
    pub description: String,

    /// Board column
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,

    /// Priority
    #[sqlx(try_from = "String")]
    pub priority: Priority,

    /// Assignee identifier (email)
    pub assigned_to: String,

    /// Creator identifier (email)
    pub created_by: String,

    /// Optional due date (calendar date, no time component)
    pub due_date: Option<NaiveDate>,

    /// When the task was created
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Whether `user` created or is assigned to this task
    pub fn involves(&self, user: &str) -> bool {
        self.created_by == user || self.assigned_to == user
    }
}

/// Task joined with the assignee's display name
///
/// `assignee_name` is `None` when no `users` row matches `assigned_to`, or
/// when the row was produced by an unjoined query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssignedTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,

    /// Display name of the assignee
    pub assignee_name: Option<String>,
}

impl From<Task> for AssignedTask {
    fn from(task: Task) -> Self {
        Self {
            task,
            assignee_name: None,
        }
    }
}

/// Input for creating a task
///
/// New tasks always start in the `To Do` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub assigned_to: String,
    pub created_by: String,
    pub due_date: Option<NaiveDate>,
}

/// Partial task update
///
/// Only `Some` fields are written. `due_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    /// Patch that only moves the task to another column
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
    }

    /// Applies the patch to an in-memory task
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assigned_to) = &self.assigned_to {
            task.assigned_to = assigned_to.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

/// Result ordering for task listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskOrder {
    /// Most recently created first
    #[default]
    NewestFirst,

    /// Earliest due date first (tasks without a due date last)
    DueSoonest,
}

impl TaskOrder {
    fn sql(&self) -> &'static str {
        match self {
            TaskOrder::NewestFirst => " ORDER BY t.created_at DESC",
            TaskOrder::DueSoonest => " ORDER BY t.due_date ASC NULLS LAST, t.created_at DESC",
        }
    }

    /// Compares two tasks the same way the SQL ordering does
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            TaskOrder::NewestFirst => b.created_at.cmp(&a.created_at),
            TaskOrder::DueSoonest => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y).then_with(|| b.created_at.cmp(&a.created_at)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => b.created_at.cmp(&a.created_at),
            },
        }
    }
}

/// Filter for task listings
///
/// Every view builds one of these; the same value drives the SQL query and
/// the in-memory filter so both backends agree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
    /// Only tasks created by or assigned to this user
    pub involving: Option<String>,

    /// Drop tasks in this status
    pub exclude_status: Option<TaskStatus>,

    /// Only tasks that have a due date
    pub due_date_only: bool,

    /// Result ordering
    pub order: TaskOrder,

    /// Maximum number of rows
    pub limit: Option<i64>,
}

impl TaskQuery {
    /// Tasks created by or assigned to `user`
    pub fn involving(user: impl Into<String>) -> Self {
        Self {
            involving: Some(user.into()),
            ..Default::default()
        }
    }

    /// Excludes tasks in `status`
    pub fn excluding(mut self, status: TaskStatus) -> Self {
        self.exclude_status = Some(status);
        self
    }

    /// Keeps only tasks with a due date
    pub fn with_due_date(mut self) -> Self {
        self.due_date_only = true;
        self
    }

    /// Sets the ordering
    pub fn ordered_by(mut self, order: TaskOrder) -> Self {
        self.order = order;
        self
    }

    /// Caps the number of rows
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `task` passes the filter (ordering and limit not applied)
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(user) = &self.involving {
            if !task.involves(user) {
                return false;
            }
        }
        if let Some(status) = self.exclude_status {
            if task.status == status {
                return false;
            }
        }
        if self.due_date_only && task.due_date.is_none() {
            return false;
        }
        true
    }

    fn push_filters(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(user) = &self.involving {
            qb.push(" AND (t.created_by = ")
                .push_bind(user.clone())
                .push(" OR t.assigned_to = ")
                .push_bind(user.clone())
                .push(")");
        }
        if let Some(status) = self.exclude_status {
            qb.push(" AND t.status <> ").push_bind(status.as_str());
        }
        if self.due_date_only {
            qb.push(" AND t.due_date IS NOT NULL");
        }

        qb.push(self.order.sql());

        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
    }
}

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.status, t.priority, \
     t.assigned_to, t.created_by, t.due_date, t.created_at";

impl Task {
    /// Creates a task in the `To Do` column
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks AS t (title, description, status, priority, assigned_to, created_by, due_date)
            VALUES ($1, $2, 'To Do', $3, $4, $5, $6)
            RETURNING t.id, t.title, t.description, t.status, t.priority,
                      t.assigned_to, t.created_by, t.due_date, t.created_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority.as_str())
        .bind(data.assigned_to)
        .bind(data.created_by)
        .bind(data.due_date)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks matching `query`
    pub async fn list(pool: &PgPool, query: &TaskQuery) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {TASK_COLUMNS} FROM tasks t"));
        query.push_filters(&mut qb);

        let tasks = qb.build_query_as::<Task>().fetch_all(pool).await?;
        Ok(tasks)
    }

    /// Lists tasks matching `query`, joined with the assignee's display name
    ///
    /// The join is a LEFT JOIN on `users.email`, so tasks assigned to an
    /// identifier without a profile row are still returned.
    pub async fn list_with_assignee(
        pool: &PgPool,
        query: &TaskQuery,
    ) -> Result<Vec<AssignedTask>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TASK_COLUMNS}, u.name AS assignee_name \
             FROM tasks t LEFT JOIN users u ON u.email = t.assigned_to"
        ));
        query.push_filters(&mut qb);

        let tasks = qb.build_query_as::<AssignedTask>().fetch_all(pool).await?;
        Ok(tasks)
    }

    /// Applies a partial update
    ///
    /// Returns `None` if no task has this ID.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        if patch.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks AS t SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(title) = &patch.title {
                set.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(description) = &patch.description {
                set.push("description = ").push_bind_unseparated(description.clone());
            }
            if let Some(status) = patch.status {
                set.push("status = ").push_bind_unseparated(status.as_str());
            }
            if let Some(priority) = patch.priority {
                set.push("priority = ").push_bind_unseparated(priority.as_str());
            }
            if let Some(assigned_to) = &patch.assigned_to {
                set.push("assigned_to = ").push_bind_unseparated(assigned_to.clone());
            }
            if let Some(due_date) = patch.due_date {
                set.push("due_date = ").push_bind_unseparated(due_date);
            }
        }
        qb.push(" WHERE t.id = ").push_bind(id);
        qb.push(format!(" RETURNING {TASK_COLUMNS}"));

        let task = qb.build_query_as::<Task>().fetch_optional(pool).await?;
        Ok(task)
    }

    /// Deletes a task
    ///
    /// Comments on the task are removed by the foreign key cascade.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

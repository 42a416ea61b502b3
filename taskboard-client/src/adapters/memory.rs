/// In-memory backend for tests and demos
///
/// [`MemoryBackend`] implements both [`RemoteStore`] and [`ChangeFeed`]. Every
/// mutation is delivered synchronously to matching subscribers, so a test
/// can mutate the store and immediately see the notification queued on a
/// mounted view.
///
/// Failures can be injected per concern:
///
/// - `fail_writes`: inserts, updates and deletes are rejected
/// - `fail_joins`: only the joined task read fails
/// - `fail_reads`: every read fails
///
/// # Example
///
/// ```
/// use taskboard_client::adapters::MemoryBackend;
/// use taskboard_client::store::RemoteStore;
/// use taskboard_shared::models::task::{NewTask, Priority, TaskQuery};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// backend.insert_task(NewTask {
///     title: "Ship it".to_string(),
///     description: String::new(),
///     priority: Priority::High,
///     assigned_to: "ana@example.com".to_string(),
///     created_by: "ana@example.com".to_string(),
///     due_date: None,
/// }).await?;
///
/// backend.fail_writes(Some("offline"));
/// let tasks = backend.tasks(&TaskQuery::involving("ana@example.com")).await?;
/// assert_eq!(tasks.len(), 1);
/// # Ok(())
/// # }
/// ```

use crate::error::{StoreError, StoreResult};
use crate::feed::{ChangeFeed, Subscription};
use crate::store::RemoteStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use taskboard_shared::events::{ChangeEvent, ChangeKind, ChannelSpec, Table};
use taskboard_shared::models::comment::{Comment, CommentWithTask, NewComment};
use taskboard_shared::models::task::{AssignedTask, NewTask, Task, TaskPatch, TaskQuery, TaskStatus};
use taskboard_shared::models::user::{default_name, User};
use tokio::sync::mpsc;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Tables {
    tasks: Vec<Task>,
    users: Vec<User>,
    comments: Vec<Comment>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing creation times so ordering is deterministic
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn assignee_name(&self, email: &str) -> Option<String> {
        self.users
            .iter()
            .find(|u| u.email == email)
            .and_then(|u| u.name.clone())
    }
}

#[derive(Default)]
struct Failures {
    writes: Option<String>,
    reads: Option<String>,
    joins: bool,
}

struct Subscriber {
    spec: ChannelSpec,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    failures: Mutex<Failures>,
    next_subscriber: AtomicU64,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Shared in-memory store; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every write with `message`, or stops rejecting on `None`
    pub fn fail_writes(&self, message: Option<&str>) {
        lock(&self.inner.failures).writes = message.map(str::to_string);
    }

    /// Rejects every read with `message`, or stops rejecting on `None`
    pub fn fail_reads(&self, message: Option<&str>) {
        lock(&self.inner.failures).reads = message.map(str::to_string);
    }

    /// Makes the joined task read fail while plain reads still work
    pub fn fail_joins(&self, fail: bool) {
        lock(&self.inner.failures).joins = fail;
    }

    /// Inserts a task as-is, without notifying anyone
    pub fn seed_task(&self, task: Task) {
        let mut tables = lock(&self.inner.tables);
        if tables.last_timestamp.map_or(true, |last| task.created_at > last) {
            tables.last_timestamp = Some(task.created_at);
        }
        tables.tasks.push(task);
    }

    /// Inserts a profile as-is, without notifying anyone
    pub fn seed_user(&self, user: User) {
        lock(&self.inner.tables).users.push(user);
    }

    /// Current copy of a task
    pub fn task(&self, id: Uuid) -> Option<Task> {
        lock(&self.inner.tables).tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn comment_count(&self) -> usize {
        lock(&self.inner.tables).comments.len()
    }

    /// Subscriptions currently open
    pub fn open_channels(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    /// Subscriptions ever opened
    pub fn opened_channels(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Subscriptions ever closed
    pub fn closed_channels(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> StoreResult<()> {
        match &lock(&self.inner.failures).writes {
            Some(message) => Err(StoreError::Rejected(message.clone())),
            None => Ok(()),
        }
    }

    fn check_read(&self) -> StoreResult<()> {
        match &lock(&self.inner.failures).reads {
            Some(message) => Err(StoreError::Rejected(message.clone())),
            None => Ok(()),
        }
    }

    fn check_join(&self) -> StoreResult<()> {
        if lock(&self.inner.failures).joins {
            return Err(StoreError::Rejected(
                "Could not find a relationship between 'tasks' and 'users'".to_string(),
            ));
        }
        Ok(())
    }

    fn notify<T: Serialize>(&self, table: Table, kind: ChangeKind, row: &T) {
        let event = match ChangeEvent::for_row(table, kind, row) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "Failed to encode change event");
                return;
            }
        };

        let subscribers = lock(&self.inner.subscribers);
        for subscriber in subscribers.values() {
            if subscriber.spec.matches(&event) {
                // A closed receiver is removed by its release hook
                let _ = subscriber.tx.send(event.clone());
            }
        }
    }

    fn filtered_tasks(&self, query: &TaskQuery) -> Vec<Task> {
        let tables = lock(&self.inner.tables);
        let mut tasks: Vec<Task> = tables
            .tasks
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| query.order.compare(a, b));
        if let Some(limit) = query.limit {
            tasks.truncate(limit.max(0) as usize);
        }
        tasks
    }
}

#[async_trait]
impl RemoteStore for MemoryBackend {
    async fn tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        self.check_read()?;
        Ok(self.filtered_tasks(query))
    }

    async fn tasks_with_assignee(&self, query: &TaskQuery) -> StoreResult<Vec<AssignedTask>> {
        self.check_read()?;
        self.check_join()?;

        let tasks = self.filtered_tasks(query);
        let tables = lock(&self.inner.tables);
        Ok(tasks
            .into_iter()
            .map(|task| AssignedTask {
                assignee_name: tables.assignee_name(&task.assigned_to),
                task,
            })
            .collect())
    }

    async fn insert_task(&self, new: NewTask) -> StoreResult<Task> {
        self.check_write()?;

        let task = {
            let mut tables = lock(&self.inner.tables);
            let task = Task {
                id: Uuid::new_v4(),
                title: new.title,
                description: new.description,
                status: TaskStatus::ToDo,
                priority: new.priority,
                assigned_to: new.assigned_to,
                created_by: new.created_by,
                due_date: new.due_date,
                created_at: tables.next_timestamp(),
            };
            tables.tasks.push(task.clone());
            task
        };

        self.notify(Table::Tasks, ChangeKind::Insert, &task);
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> StoreResult<Task> {
        self.check_write()?;

        let task = {
            let mut tables = lock(&self.inner.tables);
            let task = tables
                .tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "task",
                    id: id.to_string(),
                })?;
            patch.apply_to(task);
            task.clone()
        };

        self.notify(Table::Tasks, ChangeKind::Update, &task);
        Ok(task)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        self.check_write()?;

        let (task, comments) = {
            let mut tables = lock(&self.inner.tables);
            let index = tables
                .tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "task",
                    id: id.to_string(),
                })?;
            let task = tables.tasks.remove(index);
            let (removed, kept): (Vec<Comment>, Vec<Comment>) =
                tables.comments.drain(..).partition(|c| c.task_id == id);
            tables.comments = kept;
            (task, removed)
        };

        for comment in &comments {
            self.notify(Table::Comments, ChangeKind::Delete, comment);
        }
        self.notify(Table::Tasks, ChangeKind::Delete, &task);
        Ok(())
    }

    async fn comments_for_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        self.check_read()?;

        let tables = lock(&self.inner.tables);
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn recent_comments(&self, task_ids: &[Uuid], limit: i64) -> StoreResult<Vec<CommentWithTask>> {
        self.check_read()?;

        let tables = lock(&self.inner.tables);
        let mut comments: Vec<&Comment> = tables
            .comments
            .iter()
            .filter(|c| task_ids.contains(&c.task_id))
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments.truncate(limit.max(0) as usize);

        Ok(comments
            .into_iter()
            .map(|comment| CommentWithTask {
                task_title: tables
                    .tasks
                    .iter()
                    .find(|t| t.id == comment.task_id)
                    .map(|t| t.title.clone()),
                comment: comment.clone(),
            })
            .collect())
    }

    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment> {
        self.check_write()?;

        let comment = {
            let mut tables = lock(&self.inner.tables);
            if !tables.tasks.iter().any(|t| t.id == new.task_id) {
                return Err(StoreError::Rejected(format!(
                    "insert or update on table \"comments\" violates foreign key constraint (task {})",
                    new.task_id
                )));
            }
            let comment = Comment {
                id: Uuid::new_v4(),
                task_id: new.task_id,
                user_id: new.user_id,
                comment: new.comment,
                created_at: tables.next_timestamp(),
            };
            tables.comments.push(comment.clone());
            comment
        };

        self.notify(Table::Comments, ChangeKind::Insert, &comment);
        Ok(comment)
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_read()?;
        Ok(lock(&self.inner.tables).users.iter().find(|u| u.id == id).cloned())
    }

    async fn users_by_email(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        self.check_read()?;

        let mut users: Vec<User> = lock(&self.inner.tables)
            .users
            .iter()
            .filter(|u| emails.contains(&u.email))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn search_users(&self, term: &str, limit: i64) -> StoreResult<Vec<User>> {
        self.check_read()?;

        let needle = term.to_lowercase();
        let mut users: Vec<User> = lock(&self.inner.tables)
            .users
            .iter()
            .filter(|u| {
                u.email.to_lowercase().contains(&needle)
                    || u.name.as_deref().map_or(false, |n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }

    async fn upsert_profile(&self, id: Uuid, email: &str) -> StoreResult<User> {
        self.check_write()?;

        let (user, kind) = {
            let mut tables = lock(&self.inner.tables);
            match tables.users.iter_mut().find(|u| u.id == id) {
                Some(user) => {
                    user.email = email.to_string();
                    if user.name.is_none() {
                        user.name = Some(default_name(email).to_string());
                    }
                    (user.clone(), ChangeKind::Update)
                }
                None => {
                    let user = User {
                        id,
                        email: email.to_string(),
                        name: Some(default_name(email).to_string()),
                    };
                    tables.users.push(user.clone());
                    (user, ChangeKind::Insert)
                }
            }
        };

        self.notify(Table::Users, kind, &user);
        Ok(user)
    }

    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<User> {
        self.check_write()?;

        let user = {
            let mut tables = lock(&self.inner.tables);
            let user = tables
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "user",
                    id: id.to_string(),
                })?;
            user.name = Some(name.to_string());
            user.clone()
        };

        self.notify(Table::Users, ChangeKind::Update, &user);
        Ok(user)
    }
}

#[async_trait]
impl ChangeFeed for MemoryBackend {
    async fn subscribe(&self, spec: ChannelSpec) -> StoreResult<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);

        lock(&self.inner.subscribers).insert(
            id,
            Subscriber {
                spec: spec.clone(),
                tx,
            },
        );
        self.inner.opened.fetch_add(1, Ordering::SeqCst);

        let inner = Arc::clone(&self.inner);
        Ok(Subscription::new(&spec, rx, move || {
            if lock(&inner.subscribers).remove(&id).is_some() {
                inner.closed.fetch_add(1, Ordering::SeqCst);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_shared::events::ColumnFilter;
    use taskboard_shared::models::task::Priority;

    fn new_task(title: &str, assignee: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
            priority: Priority::Medium,
            assigned_to: assignee.to_string(),
            created_by: "ana@example.com".to_string(),
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_created_at_strictly_increases() {
        let backend = MemoryBackend::new();
        let a = backend.insert_task(new_task("a", "ana@example.com")).await.unwrap();
        let b = backend.insert_task(new_task("b", "ana@example.com")).await.unwrap();
        assert!(b.created_at > a.created_at);

        let tasks = backend.tasks(&TaskQuery::default()).await.unwrap();
        assert_eq!(tasks[0].id, b.id);
    }

    #[tokio::test]
    async fn test_join_is_left_join_on_email() {
        let backend = MemoryBackend::new();
        backend.upsert_profile(Uuid::new_v4(), "bo@example.com").await.unwrap();
        backend.insert_task(new_task("known", "bo@example.com")).await.unwrap();
        backend.insert_task(new_task("unknown", "zed@example.com")).await.unwrap();

        let tasks = backend.tasks_with_assignee(&TaskQuery::default()).await.unwrap();
        let names: Vec<_> = tasks
            .iter()
            .map(|t| (t.task.title.as_str(), t.assignee_name.as_deref()))
            .collect();
        assert_eq!(names, vec![("unknown", None), ("known", Some("bo"))]);
    }

    #[tokio::test]
    async fn test_subscribers_receive_matching_events() {
        let backend = MemoryBackend::new();
        let task = backend.insert_task(new_task("t", "ana@example.com")).await.unwrap();
        let other = backend.insert_task(new_task("o", "ana@example.com")).await.unwrap();

        let spec = ChannelSpec::new(Table::Comments)
            .filter(ColumnFilter::eq("task_id", task.id))
            .kind(ChangeKind::Insert);
        let mut sub = backend.subscribe(spec).await.unwrap();

        for id in [task.id, other.id] {
            backend
                .insert_comment(NewComment {
                    task_id: id,
                    user_id: "ana@example.com".to_string(),
                    comment: "hi".to_string(),
                })
                .await
                .unwrap();
        }

        assert_eq!(sub.drain(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_comments() {
        let backend = MemoryBackend::new();
        let task = backend.insert_task(new_task("t", "ana@example.com")).await.unwrap();
        backend
            .insert_comment(NewComment {
                task_id: task.id,
                user_id: "ana@example.com".to_string(),
                comment: "hi".to_string(),
            })
            .await
            .unwrap();

        backend.delete_task(task.id).await.unwrap();

        assert_eq!(backend.comment_count(), 0);
        assert!(backend.task(task.id).is_none());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let backend = MemoryBackend::new();
        backend.fail_writes(Some("offline"));
        let err = backend.insert_task(new_task("t", "ana@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "offline");

        backend.fail_writes(None);
        backend.fail_joins(true);
        assert!(backend.tasks_with_assignee(&TaskQuery::default()).await.is_err());
        assert!(backend.tasks(&TaskQuery::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_channel_counters() {
        let backend = MemoryBackend::new();
        let mut first = backend.subscribe(ChannelSpec::new(Table::Tasks)).await.unwrap();
        let second = backend.subscribe(ChannelSpec::new(Table::Users)).await.unwrap();
        assert_eq!(backend.open_channels(), 2);

        first.close();
        drop(first);
        drop(second);

        assert_eq!(backend.open_channels(), 0);
        assert_eq!(backend.opened_channels(), 2);
        assert_eq!(backend.closed_channels(), 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_limited() {
        let backend = MemoryBackend::new();
        for email in ["ana@example.com", "ANABEL@example.com", "bo@example.com"] {
            backend.upsert_profile(Uuid::new_v4(), email).await.unwrap();
        }

        let found = backend.search_users("ana", 5).await.unwrap();
        assert_eq!(found.len(), 2);

        let limited = backend.search_users("example", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}

//! Results that arrive after a view is aborted are never applied

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use taskboard_client::adapters::MemoryBackend;
use taskboard_client::auth::Identity;
use taskboard_client::error::StoreResult;
use taskboard_client::notifier::RecordingNotifier;
use taskboard_client::store::RemoteStore;
use taskboard_client::views::{BoardView, CommentsView, Services, SyncedView};
use taskboard_shared::models::comment::{Comment, CommentWithTask, NewComment};
use taskboard_shared::models::task::{AssignedTask, NewTask, Priority, Task, TaskPatch, TaskQuery, TaskStatus};
use taskboard_shared::models::user::User;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const ME: &str = "ana@example.com";
const TEAMMATE: &str = "bo@example.com";

/// Memory store that cancels a view's abort signal while a request is in
/// flight, after the backend has already answered
#[derive(Clone)]
struct AbortingStore {
    backend: MemoryBackend,
    on_update: Arc<Mutex<Option<CancellationToken>>>,
    on_user_lookup: Arc<Mutex<Option<CancellationToken>>>,
}

impl AbortingStore {
    fn new(backend: MemoryBackend) -> Self {
        Self {
            backend,
            on_update: Arc::new(Mutex::new(None)),
            on_user_lookup: Arc::new(Mutex::new(None)),
        }
    }

    fn abort_on_update(&self, signal: CancellationToken) {
        *self.on_update.lock().unwrap() = Some(signal);
    }

    fn abort_on_user_lookup(&self, signal: CancellationToken) {
        *self.on_user_lookup.lock().unwrap() = Some(signal);
    }

    fn fire(slot: &Mutex<Option<CancellationToken>>) {
        if let Some(signal) = slot.lock().unwrap().take() {
            signal.cancel();
        }
    }
}

#[async_trait]
impl RemoteStore for AbortingStore {
    async fn tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        self.backend.tasks(query).await
    }

    async fn tasks_with_assignee(&self, query: &TaskQuery) -> StoreResult<Vec<AssignedTask>> {
        self.backend.tasks_with_assignee(query).await
    }

    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        self.backend.insert_task(task).await
    }

    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> StoreResult<Task> {
        let result = self.backend.update_task(id, patch).await;
        Self::fire(&self.on_update);
        result
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        self.backend.delete_task(id).await
    }

    async fn comments_for_task(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        self.backend.comments_for_task(task_id).await
    }

    async fn recent_comments(&self, task_ids: &[Uuid], limit: i64) -> StoreResult<Vec<CommentWithTask>> {
        self.backend.recent_comments(task_ids, limit).await
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        self.backend.insert_comment(comment).await
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.backend.user(id).await
    }

    async fn users_by_email(&self, emails: &[String]) -> StoreResult<Vec<User>> {
        let result = self.backend.users_by_email(emails).await;
        Self::fire(&self.on_user_lookup);
        result
    }

    async fn search_users(&self, term: &str, limit: i64) -> StoreResult<Vec<User>> {
        self.backend.search_users(term, limit).await
    }

    async fn upsert_profile(&self, id: Uuid, email: &str) -> StoreResult<User> {
        self.backend.upsert_profile(id, email).await
    }

    async fn rename_user(&self, id: Uuid, name: &str) -> StoreResult<User> {
        self.backend.rename_user(id, name).await
    }
}

fn me() -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: ME.to_string(),
    }
}

fn setup() -> (MemoryBackend, AbortingStore, Arc<RecordingNotifier>, Services) {
    let backend = MemoryBackend::new();
    let store = AbortingStore::new(backend.clone());
    let notifier = Arc::new(RecordingNotifier::new());
    let services = Services::new(Arc::new(store.clone()), Arc::new(backend.clone()), notifier.clone());
    (backend, store, notifier, services)
}

#[tokio::test]
async fn test_move_answered_after_abort_is_disposed() {
    let (backend, store, notifier, services) = setup();
    let task = backend
        .insert_task(NewTask {
            title: "Write report".to_string(),
            description: String::new(),
            priority: Priority::High,
            assigned_to: ME.to_string(),
            created_by: ME.to_string(),
            due_date: None,
        })
        .await
        .unwrap();

    let mut board = BoardView::mount(services, me()).await.unwrap();
    store.abort_on_update(board.lifecycle().abort_signal());

    let err = board.move_task(task.id, TaskStatus::InProgress).await.unwrap_err();

    assert!(err.is_disposed());
    assert!(notifier.alerts().is_empty());
    assert_eq!(board.task(task.id).unwrap().task.status, TaskStatus::ToDo);
    assert!(board.move_task(task.id, TaskStatus::Done).await.unwrap_err().is_disposed());
}

#[tokio::test]
async fn test_author_names_answered_after_abort_are_dropped() {
    let (backend, store, _, services) = setup();
    let task = backend
        .insert_task(NewTask {
            title: "Review".to_string(),
            description: String::new(),
            priority: Priority::Medium,
            assigned_to: ME.to_string(),
            created_by: ME.to_string(),
            due_date: None,
        })
        .await
        .unwrap();
    backend
        .insert_comment(NewComment {
            task_id: task.id,
            user_id: TEAMMATE.to_string(),
            comment: "On it".to_string(),
        })
        .await
        .unwrap();

    let mut view = CommentsView::mount(services, me(), task.id).await.unwrap();
    assert_eq!(view.author_name(TEAMMATE), "bo");

    let teammate = Uuid::new_v4();
    backend.upsert_profile(teammate, TEAMMATE).await.unwrap();
    backend.rename_user(teammate, "Bo Silva").await.unwrap();
    store.abort_on_user_lookup(view.lifecycle().abort_signal());

    let err = view.reload().await.unwrap_err();

    assert!(err.is_disposed());
    assert_eq!(view.author_name(TEAMMATE), "bo");
    assert_eq!(view.comments().len(), 1);
}

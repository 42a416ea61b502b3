/// View models
///
/// Every screen is an explicit view model with the same lifecycle:
///
/// 1. **mount**: open the change subscriptions, then fetch
/// 2. **next_change / sync_pending**: on any notification, re-fetch once
/// 3. **dispose**: abort in-flight fetches and close the subscriptions
///
/// Notification payloads are never merged into local state. However many
/// notifications are queued, they collapse into one re-fetch of the view's
/// query, so local state is always exactly what the store last returned.
///
/// # Views
///
/// - `board`: kanban columns with optimistic moves
/// - `dashboard`: stats, priority stack and recent comments
/// - `timeline`: open tasks with a due date
/// - `comments`: one task's thread and its composer
/// - `details`, `new_task`, `profile`, `login`: forms
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskboard_client::adapters::MemoryBackend;
/// use taskboard_client::auth::Identity;
/// use taskboard_client::notifier::LogNotifier;
/// use taskboard_client::views::{BoardView, Services, SyncedView};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// let services = Services::memory(&backend, Arc::new(LogNotifier));
/// let me = Identity { id: Uuid::new_v4(), email: "ana@example.com".to_string() };
///
/// let mut board = BoardView::mount(services, me).await?;
/// board.sync_pending().await?;
/// board.dispose();
/// # Ok(())
/// # }
/// ```

pub mod board;
pub mod comments;
pub mod dashboard;
pub mod details;
pub mod login;
pub mod new_task;
pub mod profile;
pub mod timeline;

pub use board::{BoardView, Column, PriorityFilter};
pub use comments::{CommentEntry, CommentsView};
pub use dashboard::{DashboardStats, DashboardView, RecentUpdate};
pub use details::TaskDetailsForm;
pub use login::{AuthMode, LoginForm};
pub use new_task::{NewTaskForm, ASSIGNEE_SEARCH_LIMIT, MIN_SEARCH_LENGTH};
pub use profile::ProfileForm;
pub use timeline::{TimelineEntry, TimelineView};

use crate::adapters::MemoryBackend;
use crate::error::{StoreResult, SyncError};
use crate::feed::ChangeFeed;
use crate::lifecycle::ViewLifecycle;
use crate::notifier::Notifier;
use crate::store::RemoteStore;
use async_trait::async_trait;
use std::sync::Arc;
use taskboard_shared::events::ChannelSpec;
use taskboard_shared::models::task::{AssignedTask, TaskQuery};

/// Backends every view needs
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn RemoteStore>,
    pub feed: Arc<dyn ChangeFeed>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    pub fn new(store: Arc<dyn RemoteStore>, feed: Arc<dyn ChangeFeed>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            feed,
            notifier,
        }
    }

    /// Store and feed both backed by `backend`
    pub fn memory(backend: &MemoryBackend, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(Arc::new(backend.clone()), Arc::new(backend.clone()), notifier)
    }
}

/// A mounted view kept in step with the store
#[async_trait]
pub trait SyncedView: Send {
    fn lifecycle(&self) -> &ViewLifecycle;

    fn lifecycle_mut(&mut self) -> &mut ViewLifecycle;

    /// Re-runs the view's query and replaces its state
    async fn refresh(&mut self) -> Result<(), SyncError>;

    /// Like [`SyncedView::refresh`], but a failed read only leaves the
    /// fallback state in place
    async fn reload(&mut self) -> Result<(), SyncError> {
        match self.refresh().await {
            Err(SyncError::Read { .. }) => Ok(()),
            other => other,
        }
    }

    /// Waits for a notification, then re-fetches once for it and anything
    /// queued behind it
    ///
    /// Returns `false` when the change feed has ended.
    async fn next_change(&mut self) -> Result<bool, SyncError> {
        let Some(event) = self.lifecycle_mut().next_event().await? else {
            return Ok(false);
        };
        let coalesced = self.lifecycle_mut().drain_pending();

        tracing::debug!(
            view = self.lifecycle().name(),
            table = %event.table,
            kind = %event.kind,
            coalesced,
            "Change received, re-fetching"
        );

        self.reload().await?;
        Ok(true)
    }

    /// Re-fetches once if any notification is queued, without waiting
    ///
    /// Returns how many notifications were consumed.
    async fn sync_pending(&mut self) -> Result<usize, SyncError> {
        self.lifecycle().ensure_live()?;

        let pending = self.lifecycle_mut().drain_pending();
        if pending > 0 {
            self.reload().await?;
        }
        Ok(pending)
    }

    /// Unmounts the view; `true` the first time
    fn dispose(&mut self) -> bool {
        self.lifecycle_mut().dispose()
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle().is_disposed()
    }
}

/// Opens every channel in `specs` on `lifecycle`
pub(crate) async fn open_channels<I>(
    services: &Services,
    lifecycle: &mut ViewLifecycle,
    specs: I,
) -> Result<(), SyncError>
where
    I: IntoIterator<Item = ChannelSpec> + Send,
    I::IntoIter: Send,
{
    for spec in specs {
        let subscription = services
            .feed
            .subscribe(spec)
            .await
            .map_err(|e| SyncError::read("change feed", e))?;
        lifecycle.attach(subscription);
    }
    Ok(())
}

/// Joined task read, retried once without the join if it fails
pub(crate) async fn fetch_assigned(store: &dyn RemoteStore, query: &TaskQuery) -> StoreResult<Vec<AssignedTask>> {
    match store.tasks_with_assignee(query).await {
        Ok(tasks) => Ok(tasks),
        Err(e) => {
            tracing::warn!(error = %e, "Joined task read failed, retrying without assignee names");
            let tasks = store.tasks(query).await?;
            Ok(tasks.into_iter().map(AssignedTask::from).collect())
        }
    }
}

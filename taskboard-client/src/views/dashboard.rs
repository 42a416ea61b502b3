/// Dashboard
///
/// Totals for the user's tasks, the six most pressing open tasks, and the
/// five newest comments on any of them. Re-fetched on task or comment
/// changes.

use crate::auth::Identity;
use crate::error::SyncError;
use crate::lifecycle::ViewLifecycle;
use crate::ordering::sort_by_priority;
use crate::views::{open_channels, Services, SyncedView};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskboard_shared::events::{ChannelSpec, Table};
use taskboard_shared::models::comment::CommentWithTask;
use taskboard_shared::models::task::{Task, TaskQuery, TaskStatus};
use taskboard_shared::models::user::default_name;
use uuid::Uuid;

/// Open tasks shown in the priority stack
pub const PRIORITY_STACK_SIZE: usize = 6;

/// Comments shown under recent updates
pub const RECENT_UPDATES: i64 = 5;

/// Shown when a comment's task can no longer be joined
pub const UNKNOWN_TASK: &str = "Unknown Task";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

impl DashboardStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
        Self {
            total,
            pending: total - completed,
            completed,
        }
    }
}

/// One line under recent updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentUpdate {
    pub comment_id: Uuid,
    pub task_id: Uuid,
    pub author: String,
    pub comment: String,
    pub task_title: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentWithTask> for RecentUpdate {
    fn from(row: CommentWithTask) -> Self {
        let CommentWithTask { comment, task_title } = row;
        Self {
            comment_id: comment.id,
            task_id: comment.task_id,
            author: default_name(&comment.user_id).to_string(),
            task_title: task_title.unwrap_or_else(|| UNKNOWN_TASK.to_string()),
            comment: comment.comment,
            created_at: comment.created_at,
        }
    }
}

pub struct DashboardView {
    services: Services,
    user: Identity,
    lifecycle: ViewLifecycle,
    stats: DashboardStats,
    priority_stack: Vec<Task>,
    recent: Vec<RecentUpdate>,
}

impl DashboardView {
    pub async fn mount(services: Services, user: Identity) -> Result<Self, SyncError> {
        let mut view = Self {
            services,
            user,
            lifecycle: ViewLifecycle::new("dashboard"),
            stats: DashboardStats::default(),
            priority_stack: Vec::new(),
            recent: Vec::new(),
        };

        open_channels(
            &view.services,
            &mut view.lifecycle,
            [ChannelSpec::new(Table::Tasks), ChannelSpec::new(Table::Comments)],
        )
        .await?;
        view.reload().await?;

        Ok(view)
    }

    pub fn stats(&self) -> DashboardStats {
        self.stats
    }

    /// Open tasks, highest priority first
    pub fn priority_stack(&self) -> &[Task] {
        &self.priority_stack
    }

    /// Newest comments first
    pub fn recent_updates(&self) -> &[RecentUpdate] {
        &self.recent
    }
}

#[async_trait]
impl SyncedView for DashboardView {
    fn lifecycle(&self) -> &ViewLifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut ViewLifecycle {
        &mut self.lifecycle
    }

    async fn refresh(&mut self) -> Result<(), SyncError> {
        let store = self.services.store.as_ref();
        let query = TaskQuery::involving(self.user.email.clone());

        let tasks = match self.lifecycle.guard(store.tasks(&query)).await? {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(user = %self.user.email, error = %e, "Error fetching dashboard data");
                return Err(SyncError::read("dashboard", e));
            }
        };

        self.stats = DashboardStats::from_tasks(&tasks);

        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        let mut open: Vec<Task> = tasks.into_iter().filter(|t| t.status.is_open()).collect();
        sort_by_priority(&mut open);
        open.truncate(PRIORITY_STACK_SIZE);
        self.priority_stack = open;

        match self.lifecycle.guard(store.recent_comments(&ids, RECENT_UPDATES)).await? {
            Ok(rows) => {
                self.recent = rows.into_iter().map(RecentUpdate::from).collect();
            }
            Err(e) => {
                tracing::error!(user = %self.user.email, error = %e, "Error fetching recent updates");
                return Err(SyncError::read("recent updates", e));
            }
        }

        tracing::debug!(
            user = %self.user.email,
            total = self.stats.total,
            stack = self.priority_stack.len(),
            recent = self.recent.len(),
            "Dashboard loaded"
        );
        Ok(())
    }
}

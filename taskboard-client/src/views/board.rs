/// Kanban board
///
/// Shows every task the user created or is assigned to, newest first, in
/// three status columns. Moving a card is optimistic: the card jumps columns
/// at once, and if the store rejects the move the board is re-fetched.

use crate::auth::Identity;
use crate::error::SyncError;
use crate::format::is_overdue;
use crate::lifecycle::ViewLifecycle;
use crate::optimistic::{OptimisticCommand, Settled};
use crate::views::{fetch_assigned, open_channels, Services, SyncedView};
use async_trait::async_trait;
use chrono::NaiveDate;
use taskboard_shared::events::{ChannelSpec, Table};
use taskboard_shared::models::task::{AssignedTask, Priority, Task, TaskPatch, TaskQuery, TaskStatus};
use uuid::Uuid;

/// Client-side priority filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(priority) => task.priority == *priority,
        }
    }
}

/// One status column
#[derive(Debug)]
pub struct Column<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a AssignedTask>,
}

impl Column<'_> {
    pub fn count(&self) -> usize {
        self.tasks.len()
    }
}

pub struct BoardView {
    services: Services,
    user: Identity,
    lifecycle: ViewLifecycle,
    tasks: Vec<AssignedTask>,
    filter: PriorityFilter,
}

impl BoardView {
    /// Subscribes to task changes, then loads the board
    pub async fn mount(services: Services, user: Identity) -> Result<Self, SyncError> {
        let mut view = Self {
            services,
            user,
            lifecycle: ViewLifecycle::new("board"),
            tasks: Vec::new(),
            filter: PriorityFilter::All,
        };

        open_channels(&view.services, &mut view.lifecycle, [ChannelSpec::new(Table::Tasks)]).await?;
        view.reload().await?;

        Ok(view)
    }

    fn query(&self) -> TaskQuery {
        TaskQuery::involving(self.user.email.clone())
    }

    /// Every loaded task, ignoring the priority filter
    pub fn tasks(&self) -> &[AssignedTask] {
        &self.tasks
    }

    pub fn task(&self, id: Uuid) -> Option<&AssignedTask> {
        self.tasks.iter().find(|t| t.task.id == id)
    }

    pub fn filter(&self) -> PriorityFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: PriorityFilter) {
        self.filter = filter;
    }

    /// Column for `status`, honouring the priority filter
    pub fn column(&self, status: TaskStatus) -> Column<'_> {
        Column {
            status,
            tasks: self
                .tasks
                .iter()
                .filter(|t| t.task.status == status && self.filter.matches(&t.task))
                .collect(),
        }
    }

    /// All three columns in board order
    pub fn columns(&self) -> Vec<Column<'_>> {
        TaskStatus::ALL.iter().map(|status| self.column(*status)).collect()
    }

    /// Cards to flag as overdue
    pub fn overdue(&self, today: NaiveDate) -> Vec<&AssignedTask> {
        self.tasks.iter().filter(|t| is_overdue(&t.task, today)).collect()
    }

    /// Moves a card to another column
    ///
    /// Local state changes before the store answers. On rejection the user
    /// is alerted and the board is replaced by a fresh fetch. If the view is
    /// aborted while either request is in flight, its answer is dropped and
    /// `Disposed` is returned without an alert.
    pub async fn move_task(&mut self, id: Uuid, to: TaskStatus) -> Result<(), SyncError> {
        self.lifecycle.ensure_live()?;

        let Some(current) = self.task(id).map(|t| t.task.status) else {
            return Err(SyncError::Validation(format!("Task {} is not on the board", id)));
        };
        if current == to {
            return Ok(());
        }

        let patch = TaskPatch::status(to);
        let query = self.query();
        let (patch, query) = (&patch, &query);
        let store = self.services.store.as_ref();
        let lifecycle = &self.lifecycle;

        let settled = OptimisticCommand::new(
            move |tasks: &mut Vec<AssignedTask>| {
                if let Some(card) = tasks.iter_mut().find(|t| t.task.id == id) {
                    card.task.status = to;
                }
            },
            move || async move {
                lifecycle
                    .guard(store.update_task(id, patch))
                    .await?
                    .map_err(|e| SyncError::write("Failed to move task", e))
            },
        )
        .execute(&mut self.tasks, move || async move {
            lifecycle
                .guard(fetch_assigned(store, query))
                .await?
                .map_err(|e| SyncError::read("tasks", e))
        })
        .await;

        match settled {
            Settled::Confirmed(task) => {
                tracing::debug!(task_id = %id, from = %current, to = %task.status, "Moved task");
                Ok(())
            }
            Settled::Reconciled { error } | Settled::Restored { error, .. } if error.is_disposed() => {
                tracing::debug!(task_id = %id, "Move abandoned, board was disposed");
                Err(error)
            }
            Settled::Restored { reconcile_error, .. } if reconcile_error.is_disposed() => {
                tracing::debug!(task_id = %id, "Move rejected after board was disposed");
                Err(reconcile_error)
            }
            Settled::Reconciled { error } => {
                tracing::error!(task_id = %id, error = %error, "Error moving task, board re-fetched");
                self.services.notifier.alert("Failed to move task");
                Err(error)
            }
            Settled::Restored { error, reconcile_error } => {
                tracing::error!(
                    task_id = %id,
                    error = %error,
                    reconcile_error = %reconcile_error,
                    "Error moving task and re-fetch failed, previous board restored"
                );
                self.services.notifier.alert("Failed to move task");
                Err(error)
            }
        }
    }
}

#[async_trait]
impl SyncedView for BoardView {
    fn lifecycle(&self) -> &ViewLifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut ViewLifecycle {
        &mut self.lifecycle
    }

    async fn refresh(&mut self) -> Result<(), SyncError> {
        let query = self.query();
        let fetched = self
            .lifecycle
            .guard(fetch_assigned(self.services.store.as_ref(), &query))
            .await?;

        match fetched {
            Ok(tasks) => {
                tracing::debug!(user = %self.user.email, count = tasks.len(), "Board loaded");
                self.tasks = tasks;
                Ok(())
            }
            Err(e) => {
                tracing::error!(user = %self.user.email, error = %e, "Error fetching tasks");
                Err(SyncError::read("tasks", e))
            }
        }
    }
}

/// Timeline of open tasks by due date

use crate::auth::Identity;
use crate::error::SyncError;
use crate::format::{days_remaining, short_date, today, DueLabel};
use crate::lifecycle::ViewLifecycle;
use crate::views::{fetch_assigned, open_channels, Services, SyncedView};
use async_trait::async_trait;
use chrono::NaiveDate;
use taskboard_shared::events::{ChannelSpec, Table};
use taskboard_shared::models::task::{AssignedTask, TaskOrder, TaskQuery, TaskStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub task: AssignedTask,
    pub due_date: NaiveDate,
    /// Due date as shown on the card, e.g. `Oct 18`
    pub due: String,
    pub days_remaining: i64,
    pub label: DueLabel,
}

impl TimelineEntry {
    /// `None` for undated tasks
    pub fn new(task: AssignedTask, today: NaiveDate) -> Option<Self> {
        let due_date = task.task.due_date?;
        let days = days_remaining(due_date, today);
        Some(Self {
            task,
            due_date,
            due: short_date(due_date),
            days_remaining: days,
            label: DueLabel::from_days(days),
        })
    }
}

pub struct TimelineView {
    services: Services,
    user: Identity,
    lifecycle: ViewLifecycle,
    tasks: Vec<AssignedTask>,
}

impl TimelineView {
    pub async fn mount(services: Services, user: Identity) -> Result<Self, SyncError> {
        let mut view = Self {
            services,
            user,
            lifecycle: ViewLifecycle::new("timeline"),
            tasks: Vec::new(),
        };

        open_channels(&view.services, &mut view.lifecycle, [ChannelSpec::new(Table::Tasks)]).await?;
        view.reload().await?;

        Ok(view)
    }

    fn query(&self) -> TaskQuery {
        TaskQuery::involving(self.user.email.clone())
            .excluding(TaskStatus::Done)
            .with_due_date()
            .ordered_by(TaskOrder::DueSoonest)
    }

    /// Entries relative to `today`, soonest first
    pub fn entries_on(&self, today: NaiveDate) -> Vec<TimelineEntry> {
        self.tasks
            .iter()
            .cloned()
            .filter_map(|task| TimelineEntry::new(task, today))
            .collect()
    }

    /// Entries relative to the local date
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.entries_on(today())
    }

    /// Nothing due; the empty state is shown
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl SyncedView for TimelineView {
    fn lifecycle(&self) -> &ViewLifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut ViewLifecycle {
        &mut self.lifecycle
    }

    async fn refresh(&mut self) -> Result<(), SyncError> {
        let query = self.query();
        match self
            .lifecycle
            .guard(fetch_assigned(self.services.store.as_ref(), &query))
            .await?
        {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(())
            }
            Err(e) => {
                tracing::error!(user = %self.user.email, error = %e, "Error fetching timeline tasks");
                Err(SyncError::read("timeline", e))
            }
        }
    }
}

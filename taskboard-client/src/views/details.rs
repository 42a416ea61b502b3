/// Task details form: edit, save, delete

use crate::error::SyncError;
use crate::views::new_task::TaskDraft;
use crate::views::Services;
use taskboard_shared::models::task::{Task, TaskPatch, TaskStatus};
use taskboard_shared::models::user::User;

/// People offered in the assignee dropdown
const ASSIGNEE_OPTIONS_LIMIT: i64 = 100;

pub struct TaskDetailsForm {
    services: Services,
    task: Task,
    pub draft: TaskDraft,
    pub status: TaskStatus,
}

impl TaskDetailsForm {
    pub fn open(services: Services, task: Task) -> Self {
        let draft = TaskDraft {
            title: task.title.clone(),
            description: task.description.clone(),
            assigned_to: task.assigned_to.clone(),
            priority: task.priority,
            due_date: task.due_date,
        };
        Self {
            status: task.status,
            services,
            task,
            draft,
        }
    }

    /// Task as last saved
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Everyone who can be assigned; empty if the lookup fails
    pub async fn assignee_options(&self) -> Vec<User> {
        match self.services.store.search_users("", ASSIGNEE_OPTIONS_LIMIT).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(task_id = %self.task.id, error = %e, "Error fetching users");
                Vec::new()
            }
        }
    }

    /// Fields that differ from the saved task
    pub fn patch(&self) -> Result<TaskPatch, SyncError> {
        let draft = self.draft.checked()?;
        let task = &self.task;

        Ok(TaskPatch {
            title: (draft.title != task.title).then_some(draft.title),
            description: (draft.description != task.description).then_some(draft.description),
            status: (self.status != task.status).then_some(self.status),
            priority: (draft.priority != task.priority).then_some(draft.priority),
            assigned_to: (draft.assigned_to != task.assigned_to).then_some(draft.assigned_to),
            due_date: (draft.due_date != task.due_date).then_some(draft.due_date),
        })
    }

    /// Saves changed fields; an unchanged form sends nothing
    pub async fn save(&mut self) -> Result<&Task, SyncError> {
        let patch = self.patch()?;
        if patch.is_empty() {
            return Ok(&self.task);
        }

        match self.services.store.update_task(self.task.id, &patch).await {
            Ok(task) => {
                tracing::info!(task_id = %task.id, "Task updated");
                self.task = task;
                Ok(&self.task)
            }
            Err(e) => {
                tracing::error!(task_id = %self.task.id, error = %e, "Error updating task");
                self.services.notifier.alert("Failed to update task");
                Err(SyncError::write("Failed to update task", e))
            }
        }
    }

    /// Deletes the task once the user has confirmed
    ///
    /// Returns `Ok(false)` and sends nothing when `confirmed` is false.
    pub async fn delete(&self, confirmed: bool) -> Result<bool, SyncError> {
        if !confirmed {
            return Ok(false);
        }

        match self.services.store.delete_task(self.task.id).await {
            Ok(()) => {
                tracing::info!(task_id = %self.task.id, "Task deleted");
                Ok(true)
            }
            Err(e) => {
                tracing::error!(task_id = %self.task.id, error = %e, "Error deleting task");
                self.services.notifier.alert("Failed to delete task");
                Err(SyncError::write("Failed to delete task", e))
            }
        }
    }
}

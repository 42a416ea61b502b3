/// New task form
///
/// Holds a [`TaskDraft`] and the assignee picker. The assignee defaults to
/// the signed-in user; searching needs at least two characters and shows at
/// most five people.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskboard_client::adapters::MemoryBackend;
/// use taskboard_client::auth::Identity;
/// use taskboard_client::notifier::LogNotifier;
/// use taskboard_client::views::{NewTaskForm, Services};
/// use taskboard_shared::models::task::Priority;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// let me = Identity { id: Uuid::new_v4(), email: "ana@example.com".to_string() };
/// let mut form = NewTaskForm::new(Services::memory(&backend, Arc::new(LogNotifier)), me);
///
/// form.draft.title = "Book venue".to_string();
/// form.draft.priority = Priority::High;
/// let task = form.submit().await?;
/// assert_eq!(task.assigned_to, "ana@example.com");
/// # Ok(())
/// # }
/// ```

use crate::auth::Identity;
use crate::error::SyncError;
use crate::views::Services;
use chrono::NaiveDate;
use taskboard_shared::models::task::{NewTask, Priority, Task};
use taskboard_shared::models::user::User;
use validator::{Validate, ValidationErrors};

/// Shortest search term that queries the store
pub const MIN_SEARCH_LENGTH: usize = 2;

/// Most people shown by the assignee search
pub const ASSIGNEE_SEARCH_LIMIT: i64 = 5;

/// Editable task fields
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct TaskDraft {
    #[validate(length(min = 1, max = 255, message = "Title is required and must be at most 255 characters"))]
    pub title: String,

    pub description: String,

    #[validate(length(min = 1, message = "Please assign the task to someone."))]
    pub assigned_to: String,

    pub priority: Priority,

    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    /// Blank draft assigned to `assignee`
    pub fn assigned_to(assignee: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            assigned_to: assignee.into(),
            priority: Priority::default(),
            due_date: None,
        }
    }

    /// Validates a trimmed copy
    pub fn checked(&self) -> Result<TaskDraft, SyncError> {
        let draft = TaskDraft {
            title: self.title.trim().to_string(),
            assigned_to: self.assigned_to.trim().to_string(),
            ..self.clone()
        };
        draft
            .validate()
            .map_err(|e| SyncError::Validation(first_message(&e, &["title", "assigned_to"])))?;
        Ok(draft)
    }
}

/// Message of the first failing field in `order`
pub(crate) fn first_message(errors: &ValidationErrors, order: &[&str]) -> String {
    let fields = errors.field_errors();
    order
        .iter()
        .filter_map(|field| fields.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

pub struct NewTaskForm {
    services: Services,
    user: Identity,
    pub draft: TaskDraft,
    search_term: String,
    results: Vec<User>,
}

impl NewTaskForm {
    pub fn new(services: Services, user: Identity) -> Self {
        let draft = TaskDraft::assigned_to(user.email.clone());
        Self {
            services,
            user,
            draft,
            search_term: String::new(),
            results: Vec::new(),
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn results(&self) -> &[User] {
        &self.results
    }

    /// Updates the assignee search
    ///
    /// Terms shorter than [`MIN_SEARCH_LENGTH`] clear the results without
    /// querying. A failed search is logged and shows nothing.
    pub async fn search(&mut self, term: &str) -> &[User] {
        self.search_term = term.to_string();

        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_LENGTH {
            self.results.clear();
            return &self.results;
        }

        match self.services.store.search_users(term, ASSIGNEE_SEARCH_LIMIT).await {
            Ok(users) => self.results = users,
            Err(e) => {
                tracing::error!(term = %term, error = %e, "Error searching users");
                self.results.clear();
            }
        }
        &self.results
    }

    /// Picks a search result as assignee
    pub fn assign_to(&mut self, user: &User) {
        self.draft.assigned_to = user.email.clone();
        self.search_term.clear();
        self.results.clear();
    }

    pub fn assign_to_self(&mut self) {
        self.draft.assigned_to = self.user.email.clone();
        self.search_term.clear();
        self.results.clear();
    }

    /// Creates the task and resets the form
    ///
    /// Invalid drafts are alerted and nothing is sent.
    pub async fn submit(&mut self) -> Result<Task, SyncError> {
        let draft = match self.draft.checked() {
            Ok(draft) => draft,
            Err(e) => {
                self.services.notifier.alert(&e.to_string());
                return Err(e);
            }
        };

        let new_task = NewTask {
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            assigned_to: draft.assigned_to,
            created_by: self.user.email.clone(),
            due_date: draft.due_date,
        };

        match self.services.store.insert_task(new_task).await {
            Ok(task) => {
                tracing::info!(task_id = %task.id, assigned_to = %task.assigned_to, "Task created");
                self.draft = TaskDraft::assigned_to(self.user.email.clone());
                Ok(task)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error creating task");
                self.services
                    .notifier
                    .alert(&format!("Failed to create task: {}", e));
                Err(SyncError::write("Failed to create task", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryBackend;
    use crate::notifier::RecordingNotifier;
    use crate::store::RemoteStore;
    use std::sync::Arc;
    use uuid::Uuid;

    fn form() -> (NewTaskForm, MemoryBackend, Arc<RecordingNotifier>) {
        let backend = MemoryBackend::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let me = Identity {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
        };
        let form = NewTaskForm::new(Services::memory(&backend, notifier.clone()), me);
        (form, backend, notifier)
    }

    #[test]
    fn test_draft_rules() {
        let mut draft = TaskDraft::assigned_to("ana@example.com");
        assert!(draft.checked().is_err());

        draft.title = "x".repeat(256);
        assert!(draft.checked().is_err());

        draft.title = "  Plan sprint  ".to_string();
        assert_eq!(draft.checked().unwrap().title, "Plan sprint");

        draft.assigned_to = " ".to_string();
        let err = draft.checked().unwrap_err();
        assert_eq!(err.to_string(), "Please assign the task to someone.");
    }

    #[tokio::test]
    async fn test_short_search_term_queries_nothing() {
        let (mut form, backend, _) = form();
        backend.upsert_profile(Uuid::new_v4(), "bo@example.com").await.unwrap();

        assert!(form.search("b").await.is_empty());
        assert_eq!(form.search("bo").await.len(), 1);
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let (mut form, backend, _) = form();
        for i in 0..8 {
            backend
                .upsert_profile(Uuid::new_v4(), &format!("dev{}@example.com", i))
                .await
                .unwrap();
        }

        assert_eq!(form.search("dev").await.len(), 5);
    }

    #[tokio::test]
    async fn test_assign_and_reset() {
        let (mut form, backend, _) = form();
        let bo = backend.upsert_profile(Uuid::new_v4(), "bo@example.com").await.unwrap();

        form.search("bo").await;
        form.assign_to(&bo);
        assert_eq!(form.draft.assigned_to, "bo@example.com");
        assert!(form.results().is_empty());

        form.draft.title = "Review".to_string();
        let task = form.submit().await.unwrap();
        assert_eq!(task.assigned_to, "bo@example.com");
        assert_eq!(task.created_by, "ana@example.com");
        assert_eq!(form.draft.assigned_to, "ana@example.com");
        assert!(form.draft.title.is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_alerts() {
        let (mut form, backend, notifier) = form();
        backend.fail_writes(Some("permission denied"));

        form.draft.title = "Review".to_string();
        assert!(form.submit().await.is_err());
        assert_eq!(notifier.last().as_deref(), Some("Failed to create task: permission denied"));
        assert_eq!(form.draft.title, "Review");
    }
}

/// Comment thread for one task, with its composer
///
/// The subscription only hears inserts for this task. A sent comment shows
/// up through that subscription's re-fetch, not by being appended locally.

use crate::auth::Identity;
use crate::error::SyncError;
use crate::format::{clock_time, display_name, initial};
use crate::lifecycle::ViewLifecycle;
use crate::views::{open_channels, Services, SyncedView};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use taskboard_shared::events::{ChangeKind, ChannelSpec, ColumnFilter, Table};
use taskboard_shared::models::comment::{Comment, NewComment};
use uuid::Uuid;

/// A comment ready to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEntry {
    pub comment: Comment,
    pub author: String,
    pub initial: String,
    pub time: String,
    /// Written by the signed-in user
    pub mine: bool,
}

pub struct CommentsView {
    services: Services,
    user: Identity,
    task_id: Uuid,
    lifecycle: ViewLifecycle,
    comments: Vec<Comment>,
    names: HashMap<String, Option<String>>,
    draft: String,
}

impl CommentsView {
    pub async fn mount(services: Services, user: Identity, task_id: Uuid) -> Result<Self, SyncError> {
        let mut view = Self {
            services,
            user,
            task_id,
            lifecycle: ViewLifecycle::new("comments"),
            comments: Vec::new(),
            names: HashMap::new(),
            draft: String::new(),
        };

        let spec = ChannelSpec::new(Table::Comments)
            .filter(ColumnFilter::eq("task_id", task_id))
            .kind(ChangeKind::Insert);
        open_channels(&view.services, &mut view.lifecycle, [spec]).await?;
        view.reload().await?;

        Ok(view)
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Thread, oldest first
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn entries(&self) -> Vec<CommentEntry> {
        self.comments
            .iter()
            .map(|comment| {
                let author = self.author_name(&comment.user_id);
                CommentEntry {
                    initial: initial(&author),
                    time: clock_time(&comment.created_at),
                    mine: comment.user_id == self.user.email,
                    author,
                    comment: comment.clone(),
                }
            })
            .collect()
    }

    /// Profile name, else the email local part
    pub fn author_name(&self, user_id: &str) -> String {
        let name = self.names.get(user_id).and_then(|n| n.as_deref());
        display_name(name, user_id)
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Sends the draft
    ///
    /// Returns `Ok(false)` without sending when the draft is blank. The draft
    /// is cleared only after the store accepts the comment while the view is
    /// still mounted.
    pub async fn send(&mut self) -> Result<bool, SyncError> {
        self.lifecycle.ensure_live()?;

        let text = self.draft.trim();
        if text.is_empty() {
            return Ok(false);
        }

        let comment = NewComment {
            task_id: self.task_id,
            user_id: self.user.email.clone(),
            comment: text.to_string(),
        };

        match self.lifecycle.guard(self.services.store.insert_comment(comment)).await? {
            Ok(saved) => {
                tracing::debug!(task_id = %self.task_id, comment_id = %saved.id, "Comment sent");
                self.draft.clear();
                Ok(true)
            }
            Err(e) => {
                tracing::error!(task_id = %self.task_id, error = %e, "Error adding comment");
                self.services.notifier.alert("Failed to send comment");
                Err(SyncError::write("Failed to send comment", e))
            }
        }
    }

    /// Profile names for everyone in `comments`
    ///
    /// A failed lookup yields no names, so authors fall back to their email
    /// local part. Only an abort is an error.
    async fn load_names(&self, comments: &[Comment]) -> Result<HashMap<String, Option<String>>, SyncError> {
        let authors: Vec<String> = comments
            .iter()
            .map(|c| c.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if authors.is_empty() {
            return Ok(HashMap::new());
        }

        let names = match self.lifecycle.guard(self.services.store.users_by_email(&authors)).await? {
            Ok(users) => users.into_iter().map(|u| (u.email, u.name)).collect(),
            Err(e) => {
                tracing::warn!(task_id = %self.task_id, error = %e, "Error fetching users");
                HashMap::new()
            }
        };
        Ok(names)
    }
}

#[async_trait]
impl SyncedView for CommentsView {
    fn lifecycle(&self) -> &ViewLifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut ViewLifecycle {
        &mut self.lifecycle
    }

    async fn refresh(&mut self) -> Result<(), SyncError> {
        let fetched = self
            .lifecycle
            .guard(self.services.store.comments_for_task(self.task_id))
            .await?;

        match fetched {
            Ok(comments) => {
                let names = self.load_names(&comments).await?;
                self.comments = comments;
                self.names = names;
                Ok(())
            }
            Err(e) => {
                tracing::error!(task_id = %self.task_id, error = %e, "Error fetching comments");
                Err(SyncError::read("comments", e))
            }
        }
    }
}

/// Profile settings form
///
/// Errors are shown inline rather than alerted.

use crate::auth::Identity;
use crate::error::{StoreError, SyncError};
use crate::views::Services;

pub struct ProfileForm {
    services: Services,
    user: Identity,
    name: String,
    error: Option<String>,
}

impl ProfileForm {
    /// Opens the form with the stored display name
    ///
    /// A missing or unreadable profile leaves the name empty and sets
    /// `Failed to load profile`.
    pub async fn load(services: Services, user: Identity) -> Self {
        let mut form = Self {
            services,
            user,
            name: String::new(),
            error: None,
        };

        let loaded = match form.services.store.user(form.user.id).await {
            Ok(Some(profile)) => Ok(profile.name.unwrap_or_default()),
            Ok(None) => Err(StoreError::NotFound {
                entity: "user",
                id: form.user.id.to_string(),
            }),
            Err(e) => Err(e),
        };

        match loaded {
            Ok(name) => form.name = name,
            Err(e) => {
                tracing::error!(user_id = %form.user.id, error = %e, "Error fetching profile");
                form.error = Some("Failed to load profile".to_string());
            }
        }
        form
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Inline error, if the last load or save failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Saves the trimmed name
    ///
    /// A blank name is not sent and returns `Ok(None)`. On success the saved
    /// name is returned.
    pub async fn save(&mut self) -> Result<Option<String>, SyncError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Ok(None);
        }
        self.error = None;

        match self.services.store.rename_user(self.user.id, &name).await {
            Ok(_) => {
                tracing::info!(user_id = %self.user.id, "Profile updated");
                self.name = name.clone();
                Ok(Some(name))
            }
            Err(e) => {
                tracing::error!(user_id = %self.user.id, error = %e, "Error updating profile");
                self.error = Some(e.to_string());
                Err(SyncError::write("Failed to update profile", e))
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

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_and_save_trimmed() {
        let backend = MemoryBackend::new();
        let me = identity();
        backend.upsert_profile(me.id, &me.email).await.unwrap();

        let services = Services::memory(&backend, Arc::new(RecordingNotifier::new()));
        let mut form = ProfileForm::load(services, me.clone()).await;
        assert_eq!(form.name(), "ana");

        form.set_name("  Ana Lima ");
        assert_eq!(form.save().await.unwrap().as_deref(), Some("Ana Lima"));
        assert_eq!(backend.user(me.id).await.unwrap().unwrap().name.as_deref(), Some("Ana Lima"));
    }

    #[tokio::test]
    async fn test_blank_name_not_sent() {
        let backend = MemoryBackend::new();
        let me = identity();
        backend.upsert_profile(me.id, &me.email).await.unwrap();

        let services = Services::memory(&backend, Arc::new(RecordingNotifier::new()));
        let mut form = ProfileForm::load(services, me.clone()).await;
        form.set_name("   ");

        assert_eq!(form.save().await.unwrap(), None);
        assert_eq!(backend.user(me.id).await.unwrap().unwrap().name.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_missing_profile_shows_error() {
        let backend = MemoryBackend::new();
        let services = Services::memory(&backend, Arc::new(RecordingNotifier::new()));

        let form = ProfileForm::load(services, identity()).await;
        assert_eq!(form.error(), Some("Failed to load profile"));
        assert_eq!(form.name(), "");
    }

    #[tokio::test]
    async fn test_save_error_is_inline() {
        let backend = MemoryBackend::new();
        let me = identity();
        backend.upsert_profile(me.id, &me.email).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());

        let services = Services::memory(&backend, notifier.clone());
        let mut form = ProfileForm::load(services, me).await;
        backend.fail_writes(Some("permission denied"));
        form.set_name("Ana");

        assert!(form.save().await.is_err());
        assert_eq!(form.error(), Some("permission denied"));
        assert!(notifier.alerts().is_empty());
    }
}

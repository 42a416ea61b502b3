/// Login and registration form
///
/// One form, two modes. Errors and confirmations are shown inline; toggling
/// the mode clears both. Every successful sign-up or sign-in also upserts
/// the user's profile row so it exists before the board loads.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskboard_client::adapters::{MemoryBackend, MemoryCredentialStore, PasswordAuth};
/// use taskboard_client::views::{AuthMode, LoginForm};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// let auth = Arc::new(PasswordAuth::new(
///     MemoryCredentialStore::new(),
///     "test-secret-key-at-least-32-bytes-long",
/// ));
/// let mut form = LoginForm::new(auth, Arc::new(backend));
///
/// form.toggle_mode();
/// assert_eq!(form.mode(), AuthMode::SignUp);
/// form.email = "ana@example.com".to_string();
/// form.password = "hunter22".to_string();
/// form.submit().await?;
///
/// form.toggle_mode();
/// let session = form.submit().await?;
/// assert!(session.is_some());
/// # Ok(())
/// # }
/// ```

use crate::auth::{AuthProvider, Identity, Session};
use crate::error::SyncError;
use crate::store::RemoteStore;
use std::sync::Arc;

pub const SIGN_UP_MESSAGE: &str = "Registration successful! You can now sign in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

pub struct LoginForm {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn RemoteStore>,
    mode: AuthMode,
    pub email: String,
    pub password: String,
    error: Option<String>,
    message: Option<String>,
}

impl LoginForm {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            auth,
            store,
            mode: AuthMode::SignIn,
            email: String::new(),
            password: String::new(),
            error: None,
            message: None,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Switches between sign-in and sign-up
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.error = None;
        self.message = None;
    }

    /// Submits the form in the current mode
    ///
    /// Sign-up yields `Ok(None)` and a confirmation message; sign-in yields
    /// the new session.
    pub async fn submit(&mut self) -> Result<Option<Session>, SyncError> {
        self.error = None;
        self.message = None;

        let result = match self.mode {
            AuthMode::SignUp => self.auth.sign_up(&self.email, &self.password).await.map(|identity| {
                (identity, None)
            }),
            AuthMode::SignIn => self
                .auth
                .sign_in(&self.email, &self.password)
                .await
                .map(|session| (session.user.clone(), Some(session))),
        };

        let (identity, session) = match result {
            Ok(ok) => ok,
            Err(e) => {
                let message = e.to_string();
                tracing::debug!(mode = ?self.mode, error = %message, "Authentication failed");
                self.error = Some(message.clone());
                return Err(SyncError::Auth(message));
            }
        };

        self.sync_profile(&identity).await;

        if session.is_none() {
            self.message = Some(SIGN_UP_MESSAGE.to_string());
        }
        Ok(session)
    }

    /// Ends the session
    pub async fn sign_out(&mut self) -> Result<(), SyncError> {
        self.auth
            .sign_out()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))
    }

    async fn sync_profile(&self, identity: &Identity) {
        if let Err(e) = self.store.upsert_profile(identity.id, &identity.email).await {
            tracing::error!(user_id = %identity.id, error = %e, "Error syncing user profile");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryBackend, MemoryCredentialStore, PasswordAuth};

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn form() -> (LoginForm, MemoryBackend, Arc<PasswordAuth<MemoryCredentialStore>>) {
        let backend = MemoryBackend::new();
        let auth = Arc::new(PasswordAuth::new(MemoryCredentialStore::new(), SECRET));
        let form = LoginForm::new(auth.clone(), Arc::new(backend.clone()));
        (form, backend, auth)
    }

    #[tokio::test]
    async fn test_sign_up_sets_message() {
        let (mut form, backend, auth) = form();
        form.toggle_mode();
        form.email = "ana@example.com".to_string();
        form.password = "hunter22".to_string();

        assert!(form.submit().await.unwrap().is_none());
        assert_eq!(form.message(), Some(SIGN_UP_MESSAGE));
        assert!(form.error().is_none());
        assert!(auth.current_session().is_none());
        assert_eq!(backend.users_by_email(&["ana@example.com".to_string()]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_credentials_shown_inline() {
        let (mut form, _, _) = form();
        form.email = "ana@example.com".to_string();
        form.password = "nope-nope".to_string();

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
        assert_eq!(form.error(), Some("Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_toggle_clears_feedback() {
        let (mut form, _, _) = form();
        form.email = "ana@example.com".to_string();
        form.password = "nope-nope".to_string();
        let _ = form.submit().await;
        assert!(form.error().is_some());

        form.toggle_mode();
        assert!(form.error().is_none());
        assert!(form.message().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_survives_profile_failure() {
        let (mut form, backend, auth) = form();
        auth.sign_up("ana@example.com", "hunter22").await.unwrap();
        backend.fail_writes(Some("offline"));

        form.email = "ana@example.com".to_string();
        form.password = "hunter22".to_string();
        let session = form.submit().await.unwrap();

        assert!(session.is_some());
        assert!(form.error().is_none());
    }
}

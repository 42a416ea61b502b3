/// Session contract
///
/// An [`AuthProvider`] owns the current session. Views only need the
/// signed-in [`Identity`]; the login form drives sign-up, sign-in and
/// sign-out. Session changes are broadcast on a `watch` channel so the app
/// shell can switch between the login screen and the board.
///
/// # Example
///
/// ```
/// use taskboard_client::adapters::{MemoryCredentialStore, PasswordAuth};
/// use taskboard_client::auth::AuthProvider;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = PasswordAuth::new(
///     MemoryCredentialStore::new(),
///     "test-secret-key-at-least-32-bytes-long",
/// );
/// let mut changes = auth.session_changes();
///
/// auth.sign_up("ana@example.com", "hunter22").await?;
/// let session = auth.sign_in("ana@example.com", "hunter22").await?;
///
/// changes.changed().await?;
/// assert_eq!(changes.borrow().as_ref().map(|s| s.user.id), Some(session.user.id));
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use taskboard_shared::models::identity::AuthIdentity;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// Signed-in user as seen by the views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,

    /// Identifier stored on tasks and comments
    pub email: String,
}

/// Active session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Identity,

    /// Signed session token
    pub token: String,
}

/// Authentication failures
///
/// Messages are shown verbatim on the login form.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,

    /// Session token rejected
    #[error("Invalid session: {0}")]
    Token(String),

    /// Credential storage failed
    #[error("Authentication service error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Session at this instant, if any
    fn current_session(&self) -> Option<Session>;

    /// Receives every session change
    fn session_changes(&self) -> watch::Receiver<Option<Session>>;

    /// Registers credentials without signing in
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Resumes a session from a previously issued token
    async fn restore(&self, token: &str) -> Result<Session, AuthError>;
}

/// Storage for password credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find(&self, email: &str) -> Result<Option<AuthIdentity>, AuthError>;

    /// Stores a new identity, `AlreadyRegistered` if the email is taken
    async fn insert(&self, email: &str, password_hash: &str) -> Result<AuthIdentity, AuthError>;
}

/// Password sign-in with signed session tokens
///
/// Credentials are Argon2id hashes kept in a [`CredentialStore`]. A
/// successful sign-in issues an HS256 token carrying the user's id and
/// email; [`AuthProvider::restore`] accepts that token later.

use crate::auth::{AuthError, AuthProvider, CredentialStore, Identity, Session};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use taskboard_shared::auth::jwt::{create_token, validate_token, Claims};
use taskboard_shared::auth::password::{hash_password, validate_password, verify_password, PasswordError};
use taskboard_shared::models::identity::AuthIdentity;
use tokio::sync::watch;
use uuid::Uuid;
use validator::ValidateEmail;

pub struct PasswordAuth<C> {
    credentials: C,
    secret: String,
    session: watch::Sender<Option<Session>>,
}

impl<C: CredentialStore> PasswordAuth<C> {
    pub fn new(credentials: C, secret: impl Into<String>) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            credentials,
            secret: secret.into(),
            session,
        }
    }

    fn set_session(&self, session: Option<Session>) {
        self.session.send_replace(session);
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl<C: CredentialStore> AuthProvider for PasswordAuth<C> {
    fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn session_changes(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(AuthError::InvalidEmail);
        }
        validate_password(password).map_err(|e| AuthError::WeakPassword(e.to_string()))?;

        let hash = hash_password(password).map_err(|e| AuthError::Backend(e.to_string()))?;
        let identity = self.credentials.insert(&email, &hash).await?;

        tracing::info!(user_id = %identity.id, "Registered user");

        Ok(Identity {
            id: identity.id,
            email: identity.email,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let identity = self
            .credentials
            .find(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        match verify_password(password, &identity.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(user_id = %identity.id, "Rejected sign-in");
                return Err(AuthError::InvalidCredentials);
            }
            Err(PasswordError::InvalidHash(e)) => {
                tracing::error!(user_id = %identity.id, error = %e, "Stored password hash is corrupt");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::Backend(e.to_string())),
        }

        let claims = Claims::new(identity.id, identity.email.clone());
        let token = create_token(&claims, &self.secret).map_err(|e| AuthError::Token(e.to_string()))?;

        let session = Session {
            user: Identity {
                id: identity.id,
                email: identity.email,
            },
            token,
        };
        self.set_session(Some(session.clone()));

        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.current_session() {
            tracing::info!(user_id = %session.user.id, "Signed out");
        }
        self.set_session(None);
        Ok(())
    }

    async fn restore(&self, token: &str) -> Result<Session, AuthError> {
        let claims = validate_token(token, &self.secret).map_err(|e| AuthError::Token(e.to_string()))?;

        let session = Session {
            user: Identity {
                id: claims.sub,
                email: claims.email,
            },
            token: token.to_string(),
        };
        self.set_session(Some(session.clone()));
        Ok(session)
    }
}

/// Credentials held in memory
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    identities: Mutex<HashMap<String, AuthIdentity>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn identities(&self) -> MutexGuard<'_, HashMap<String, AuthIdentity>> {
        self.identities.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find(&self, email: &str) -> Result<Option<AuthIdentity>, AuthError> {
        Ok(self.identities().get(email).cloned())
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<AuthIdentity, AuthError> {
        let mut identities = self.identities();
        if identities.contains_key(email) {
            return Err(AuthError::AlreadyRegistered);
        }

        let identity = AuthIdentity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        identities.insert(email.to_string(), identity.clone());
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn auth() -> PasswordAuth<MemoryCredentialStore> {
        PasswordAuth::new(MemoryCredentialStore::new(), SECRET)
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = auth();
        let identity = auth.sign_up("Ana@Example.com ", "hunter22").await.unwrap();
        assert_eq!(identity.email, "ana@example.com");
        assert!(auth.current_session().is_none());

        let session = auth.sign_in("ana@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user, identity);
        assert_eq!(auth.current_session(), Some(session));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let auth = auth();
        auth.sign_up("ana@example.com", "hunter22").await.unwrap();

        let err = auth.sign_in("ana@example.com", "wrong-one").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");

        let err = auth.sign_in("nobody@example.com", "hunter22").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_up_rules() {
        let auth = auth();
        assert!(matches!(
            auth.sign_up("not-an-email", "hunter22").await.unwrap_err(),
            AuthError::InvalidEmail
        ));

        let err = auth.sign_up("ana@example.com", "abc").await.unwrap_err();
        assert_eq!(err.to_string(), "Password should be at least 6 characters");

        auth.sign_up("ana@example.com", "hunter22").await.unwrap();
        assert!(matches!(
            auth.sign_up("ana@example.com", "hunter22").await.unwrap_err(),
            AuthError::AlreadyRegistered
        ));
    }

    #[tokio::test]
    async fn test_session_changes_and_sign_out() {
        let auth = auth();
        let mut changes = auth.session_changes();
        auth.sign_up("ana@example.com", "hunter22").await.unwrap();
        auth.sign_in("ana@example.com", "hunter22").await.unwrap();

        changes.changed().await.unwrap();
        assert!(changes.borrow_and_update().is_some());

        auth.sign_out().await.unwrap();
        changes.changed().await.unwrap();
        assert!(changes.borrow().is_none());
    }

    #[tokio::test]
    async fn test_restore_from_token() {
        let auth = auth();
        auth.sign_up("ana@example.com", "hunter22").await.unwrap();
        let session = auth.sign_in("ana@example.com", "hunter22").await.unwrap();

        let other = PasswordAuth::new(MemoryCredentialStore::new(), SECRET);
        let restored = other.restore(&session.token).await.unwrap();
        assert_eq!(restored.user, session.user);

        let wrong = PasswordAuth::new(MemoryCredentialStore::new(), "another-secret-key-that-is-long-enough");
        assert!(matches!(wrong.restore(&session.token).await.unwrap_err(), AuthError::Token(_)));
    }
}

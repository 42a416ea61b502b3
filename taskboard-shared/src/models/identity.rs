/// Auth identity model
///
/// Credentials live apart from the `users` profile table so views can read
/// profiles without ever touching password hashes.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE auth_identities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Stored credential
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthIdentity {
    pub id: Uuid,

    /// Sign-in email, unique
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
}

impl AuthIdentity {
    /// Stores a new credential
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the email is already registered
    pub async fn create(pool: &PgPool, email: &str, password_hash: &str) -> Result<Self, sqlx::Error> {
        let identity = sqlx::query_as::<_, AuthIdentity>(
            r#"
            INSERT INTO auth_identities (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .await?;

        Ok(identity)
    }

    /// Finds a credential by email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let identity = sqlx::query_as::<_, AuthIdentity>(
            "SELECT id, email, password_hash, created_at FROM auth_identities WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(identity)
    }
}

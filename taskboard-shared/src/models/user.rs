/// User profile model and database operations
///
/// A profile row mirrors an auth identity: same `id`, same `email`, plus a
/// display name. Profiles are written by upsert whenever a user signs up or
/// signs in, so a missing row heals itself on the next login.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     name TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::User;
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::upsert_profile(&pool, Uuid::new_v4(), "ana@example.com").await?;
/// assert_eq!(user.name.as_deref(), Some("ana"));
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Same ID as the auth identity
    pub id: Uuid,

    /// Email address; this is the identifier stored on tasks and comments
    pub email: String,

    /// Optional display name
    pub name: Option<String>,
}

/// Default display name for a new profile: the local part of the email
///
/// ```
/// use taskboard_shared::models::user::default_name;
///
/// assert_eq!(default_name("ana.lima@example.com"), "ana.lima");
/// assert_eq!(default_name("no-at-sign"), "no-at-sign");
/// ```
pub fn default_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

impl User {
    /// Creates the profile for an identity, or refreshes its email
    ///
    /// On conflict only the email is updated. A display name the user has
    /// already chosen is kept; the default name is used for new rows and
    /// for rows whose name is still NULL.
    pub async fn upsert_profile(pool: &PgPool, id: Uuid, email: &str) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email,
                    name = COALESCE(users.name, EXCLUDED.name)
            RETURNING id, email, name
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(default_name(email))
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, name FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Profiles for a set of emails; unknown emails are simply absent
    pub async fn find_by_emails(pool: &PgPool, emails: &[String]) -> Result<Vec<Self>, sqlx::Error> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(
            "SELECT id, email, name FROM users WHERE email = ANY($1) ORDER BY email ASC",
        )
        .bind(emails)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Finds users whose name or email contains `term` (case-insensitive)
    pub async fn search(pool: &PgPool, term: &str, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let pattern = format!("%{}%", escape_like(term));

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name
            FROM users
            WHERE name ILIKE $1 OR email ILIKE $1
            ORDER BY email ASC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Sets the display name
    ///
    /// Returns `None` if no profile has this ID.
    pub async fn update_name(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET name = $2 WHERE id = $1 RETURNING id, email, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name() {
        assert_eq!(default_name("ana@example.com"), "ana");
        assert_eq!(default_name("@example.com"), "");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ana"), "ana");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}

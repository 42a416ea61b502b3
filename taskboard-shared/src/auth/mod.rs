/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and sign-up password rules
/// - [`jwt`]: HS256 session tokens
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "ana@example.com");
/// let token = create_token(&claims, "secret-key-that-is-32-bytes-long!")?;
/// validate_token(&token, "secret-key-that-is-32-bytes-long!")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;

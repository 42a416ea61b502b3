/// Client configuration
///
/// Loaded from environment variables, with a `.env` file picked up in
/// development.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `REDIS_URL`: Redis URL carrying change events (required)
/// - `SESSION_SECRET`: Key that signs session tokens, at least 32 characters (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
///
/// # Example
///
/// ```no_run
/// use taskboard_client::config::Config;
///
/// match Config::from_env() {
///     Ok(config) => println!("Using database with {} connections", config.database.max_connections),
///     Err(e) => eprintln!("{}", e.screen()),
/// }
/// ```

use std::env;
use std::fmt;

/// Keys that must be present for the client to start
pub const REQUIRED_KEYS: [&str; 3] = ["DATABASE_URL", "REDIS_URL", "SESSION_SECRET"];

/// Shortest accepted session secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub session: SessionConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Session token configuration
#[derive(Clone)]
pub struct SessionConfig {
    /// HS256 signing key
    pub secret: String,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig").field("secret", &"***").finish()
    }
}

/// Configuration problems found at startup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// One or more required keys are unset or empty
    #[error("missing configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A key is present but unusable
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    /// Full-screen message shown instead of the application
    pub fn screen(&self) -> String {
        let mut out = String::new();
        out.push_str("Configuration Error\n");
        out.push_str("===================\n\n");
        out.push_str("Backend configuration is missing or invalid. The application cannot start.\n\n");

        match self {
            ConfigError::Missing(keys) => {
                out.push_str(
                    "Please create a .env file in the project root with the following keys:\n",
                );
                for key in keys {
                    out.push_str(&format!("  - {}\n", key));
                }
            }
            ConfigError::Invalid { key, reason } => {
                out.push_str(&format!("{} is invalid: {}\n", key, reason));
                out.push_str("\nRequired keys:\n");
                for key in REQUIRED_KEYS {
                    out.push_str(&format!("  - {}\n", key));
                }
            }
        }

        out.push_str("\nCheck the README.md or .env.example for details.\n");
        out
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// All missing keys are reported together.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let database_url = get("DATABASE_URL").unwrap_or_default();
        let redis_url = get("REDIS_URL").unwrap_or_default();
        let secret = get("SESSION_SECRET").unwrap_or_default();

        if secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid {
                key: "SESSION_SECRET",
                reason: format!("must be at least {} characters long", MIN_SECRET_LENGTH),
            });
        }

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            None => 10,
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            redis: RedisConfig { url: redis_url },
            session: SessionConfig { secret },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_complete_config() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/taskboard"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("SESSION_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.database.url, "postgresql://localhost/taskboard");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.session.secret, SECRET);
    }

    #[test]
    fn test_missing_keys_reported_together() {
        let err = Config::from_lookup(lookup(&[("REDIS_URL", "redis://localhost")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["DATABASE_URL", "SESSION_SECRET"]));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "   "),
            ("REDIS_URL", "redis://localhost"),
            ("SESSION_SECRET", SECRET),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["DATABASE_URL"]));
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/taskboard"),
            ("REDIS_URL", "redis://localhost"),
            ("SESSION_SECRET", "short"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SESSION_SECRET", .. }));
    }

    #[test]
    fn test_invalid_pool_size() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/taskboard"),
            ("REDIS_URL", "redis://localhost"),
            ("SESSION_SECRET", SECRET),
            ("DATABASE_MAX_CONNECTIONS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DATABASE_MAX_CONNECTIONS", .. }));
    }

    #[test]
    fn test_screen_lists_missing_keys() {
        let screen = ConfigError::Missing(vec!["DATABASE_URL", "REDIS_URL"]).screen();
        assert!(screen.starts_with("Configuration Error"));
        assert!(screen.contains("The application cannot start."));
        assert!(screen.contains("  - DATABASE_URL\n"));
        assert!(screen.contains("  - REDIS_URL\n"));
        assert!(!screen.contains("SESSION_SECRET"));
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let debug = format!("{:?}", SessionConfig { secret: SECRET.to_string() });
        assert!(!debug.contains(SECRET));
    }
}

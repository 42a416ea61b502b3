//! # Taskboard Shared Library
//!
//! Backend plumbing used by the Taskboard client.
//!
//! ## Module Organization
//!
//! - `models`: Tasks, users, comments and auth identities with their SQL
//! - `db`: Connection pool and migrations
//! - `auth`: Password hashing and session tokens
//! - `events`: Row change events and their stream encoding
//! - `redis`: Redis Streams writer and reader for change events

pub mod auth;
pub mod db;
pub mod events;
pub mod models;
pub mod redis;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

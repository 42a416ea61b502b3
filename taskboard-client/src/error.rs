/// Error types for the client
///
/// [`StoreError`] comes from the remote store and change feed adapters.
/// [`SyncError`] is what view models return; each variant maps to one way
/// the UI layer reacts:
///
/// | Variant      | Reaction                                              |
/// |--------------|-------------------------------------------------------|
/// | `Config`     | fatal at startup, configuration screen               |
/// | `Auth`       | shown inline on the login form                       |
/// | `Read`       | logged, view keeps its last or empty state           |
/// | `Write`      | logged and alerted, optimistic state re-fetched      |
/// | `Disposed`   | the view was unmounted, nothing to do                |
/// | `Validation` | draft rejected before anything was sent              |

use crate::config::ConfigError;
use taskboard_shared::redis::{RedisClientError, StreamReaderError, StreamWriterError};

/// Remote store and change feed failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Backend refused the operation
    #[error("{0}")]
    Rejected(String),

    /// Change feed could not be opened or published to
    #[error("Change feed error: {0}")]
    Feed(String),
}

impl From<RedisClientError> for StoreError {
    fn from(err: RedisClientError) -> Self {
        StoreError::Feed(err.to_string())
    }
}

impl From<StreamReaderError> for StoreError {
    fn from(err: StreamReaderError) -> Self {
        StoreError::Feed(err.to_string())
    }
}

impl From<StreamWriterError> for StoreError {
    fn from(err: StreamWriterError) -> Self {
        StoreError::Feed(err.to_string())
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by view models and forms
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Sign-in or sign-up failed; the message is shown to the user
    #[error("{0}")]
    Auth(String),

    /// A view could not load its data
    #[error("Failed to load {what}: {source}")]
    Read {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    /// A user-initiated change was rejected
    #[error("{context}: {source}")]
    Write {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    /// The view has been disposed
    #[error("View has been disposed")]
    Disposed,

    /// Form input rejected before sending
    #[error("{0}")]
    Validation(String),
}

impl SyncError {
    pub fn read(what: &'static str, source: StoreError) -> Self {
        SyncError::Read { what, source }
    }

    pub fn write(context: &'static str, source: StoreError) -> Self {
        SyncError::Write { context, source }
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, SyncError::Disposed)
    }
}

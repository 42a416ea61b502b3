/// Backend adapters
///
/// The views talk to three ports: [`RemoteStore`](crate::store::RemoteStore),
/// [`ChangeFeed`](crate::feed::ChangeFeed) and
/// [`AuthProvider`](crate::auth::AuthProvider). Adapters implement them for a
/// concrete backend.
///
/// # Adapter Types
///
/// - **Memory**: Store and feed in one process, with failure injection for tests
/// - **Postgres**: sqlx-backed store that publishes every mutation
/// - **Redis**: Change feed tailing Redis Streams
/// - **Password**: Argon2 credentials with signed session tokens
///
/// # Example
///
/// ```no_run
/// use taskboard_client::adapters::{PgStore, RedisChangeFeed};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::redis::{ChangeReader, ChangeWriter, RedisClient, RedisConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let redis = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
///
/// let store = PgStore::with_writer(pool, ChangeWriter::new(redis.clone()));
/// let feed = RedisChangeFeed::new(ChangeReader::new(redis), CancellationToken::new());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod password_auth;
pub mod postgres;
pub mod redis_feed;

pub use memory::MemoryBackend;
pub use password_auth::{MemoryCredentialStore, PasswordAuth};
pub use postgres::{PgCredentialStore, PgStore};
pub use redis_feed::RedisChangeFeed;

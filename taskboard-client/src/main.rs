//! # Taskboard
//!
//! Headless board client. Signs in, mounts the board and logs the column
//! counts every time the board changes.
//!
//! ## Usage
//!
//! ```bash
//! TASKBOARD_EMAIL=ana@example.com TASKBOARD_PASSWORD=... cargo run -p taskboard-client
//! ```
//!
//! `DATABASE_URL`, `REDIS_URL` and `SESSION_SECRET` must be set (a `.env`
//! file works). Without them the configuration screen is printed and the
//! process exits.

use anyhow::Context;
use std::sync::Arc;
use taskboard_client::adapters::{PasswordAuth, PgCredentialStore, PgStore, RedisChangeFeed};
use taskboard_client::config::Config;
use taskboard_client::notifier::LogNotifier;
use taskboard_client::views::{BoardView, LoginForm, Services, SyncedView};
use taskboard_shared::db::migrations::run_migrations;
use taskboard_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use taskboard_shared::redis::{ChangeReader, ChangeWriter, RedisClient, RedisConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.screen());
            std::process::exit(1);
        }
    };

    tracing::info!("Taskboard v{} starting...", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..DatabaseConfig::default()
    })
    .await
    .context("Failed to connect to the database")?;
    run_migrations(&pool).await?;

    let redis = RedisClient::new(RedisConfig::new(config.redis.url.clone())).await?;
    tracing::info!(redis = %redis.display_url(), "Change feed ready");
    let shutdown = CancellationToken::new();

    let store = Arc::new(PgStore::with_writer(pool.clone(), ChangeWriter::new(redis.clone())));
    let feed = Arc::new(RedisChangeFeed::new(ChangeReader::new(redis), shutdown.clone()));
    let auth = Arc::new(PasswordAuth::new(
        PgCredentialStore::new(pool.clone()),
        config.session.secret.clone(),
    ));

    let mut login = LoginForm::new(auth, store.clone());
    login.email = std::env::var("TASKBOARD_EMAIL").context("TASKBOARD_EMAIL is not set")?;
    login.password = std::env::var("TASKBOARD_PASSWORD").context("TASKBOARD_PASSWORD is not set")?;
    let session = login
        .submit()
        .await?
        .context("Sign-in did not produce a session")?;

    let services = Services::new(store, feed, Arc::new(LogNotifier));
    let mut board = BoardView::mount(services, session.user.clone()).await?;
    log_columns(&board);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, exiting...");
                break;
            }
            changed = board.next_change() => match changed {
                Ok(true) => log_columns(&board),
                Ok(false) => {
                    tracing::warn!("Change feed ended");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Board stopped syncing");
                    break;
                }
            }
        }
    }

    board.dispose();
    shutdown.cancel();
    close_pool(pool).await;

    Ok(())
}

fn log_columns(board: &BoardView) {
    for column in board.columns() {
        tracing::info!(status = %column.status, count = column.count(), "Column");
    }
}

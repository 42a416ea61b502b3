//! # Taskboard Client Library
//!
//! View models for a shared kanban board kept live by row change
//! notifications, plus the adapters that connect them to a backend.
//!
//! ## Modules
//!
//! - `views`: Board, dashboard, timeline, comments and the forms
//! - `lifecycle`: Mount/dispose bookkeeping and fetch abort
//! - `optimistic`: Apply-then-confirm updates with re-fetch on failure
//! - `ordering`, `format`: Priority sort, due labels and display names
//! - `store`, `feed`, `auth`, `notifier`: Ports the views depend on
//! - `adapters`: In-memory, PostgreSQL, Redis Streams and password auth
//! - `config`, `error`: Startup configuration and error types
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use taskboard_client::adapters::MemoryBackend;
//! use taskboard_client::auth::Identity;
//! use taskboard_client::notifier::LogNotifier;
//! use taskboard_client::views::{DashboardView, Services};
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MemoryBackend::new();
//! let me = Identity { id: Uuid::new_v4(), email: "ana@example.com".to_string() };
//!
//! let dashboard = DashboardView::mount(Services::memory(&backend, Arc::new(LogNotifier)), me).await?;
//! println!("{} tasks", dashboard.stats().total);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod format;
pub mod lifecycle;
pub mod notifier;
pub mod optimistic;
pub mod ordering;
pub mod store;
pub mod views;

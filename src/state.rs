//! Shared application state.
//!
//! Axum clones this into every handler via `State` extraction. All fields
//! are cheap to clone: the pool and broadcaster are handles to shared
//! resources, the config is plain data read at startup.

use crate::{broadcast::EventBroadcaster, config::Config, db::DbPool};

/// State shared across all routes, the auth middleware, and the scheduler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub pool: DbPool,

    /// Fan-out channel for dashboard push events
    pub broadcaster: EventBroadcaster,

    /// Configuration loaded at startup
    pub config: Config,
}

//! Background session-lifecycle scheduler.
//!
//! Session liveness is a wall-clock state machine, and only `live` sessions
//! accept scans, so the transitions must be applied by a process the
//! server owns, not caught up lazily when a dashboard happens to load the
//! sessions list. A session with no dashboard open during its start time
//! must still go live on time.
//!
//! The task ticks at a fixed configurable interval and applies whatever
//! transitions are due. A failed tick is logged and retried on the next
//! one; the evaluation itself is idempotent, so overlapping or repeated
//! ticks cannot double-apply a transition or double-publish its event.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::{broadcast::EventBroadcaster, db::DbPool, services::session_service};

/// Spawn the scheduler task.
///
/// The first tick fires immediately, so transitions that came due while
/// the server was down are caught up at startup.
pub fn spawn(pool: DbPool, broadcaster: EventBroadcaster, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!("Session scheduler ticking every {}s", tick.as_secs());

        loop {
            interval.tick().await;

            match session_service::evaluate(&pool, &broadcaster, chrono::Utc::now()).await {
                Ok(applied) if !applied.is_empty() => {
                    tracing::info!("Applied {} session transition(s)", applied.len());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Session lifecycle tick failed: {e}; retrying next tick");
                }
            }
        }
    })
}

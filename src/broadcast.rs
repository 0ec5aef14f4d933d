//! Real-time event fan-out to dashboard subscribers.
//!
//! Ingestion outcomes and session lifecycle changes are pushed to every
//! connected dashboard over a single shared `tokio::sync::broadcast`
//! channel. Delivery is fire-and-forget: events reach the sockets that are
//! open at publish time, a subscriber that falls behind drops the oldest
//! messages, and having no subscribers at all is a no-op. Ingestion never
//! waits on, or fails because of, dashboard delivery.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{attendance::AttendanceStatus, session::SessionStatus};

/// A scan was recorded for the first time for its (session, student) pair.
pub const SCAN_INGESTED: &str = "scan.ingested";
/// A scan matched an existing record; nothing was written.
pub const SCAN_DUPLICATE: &str = "scan.duplicate";
/// A scan was rejected after device authentication.
pub const SCAN_ERROR: &str = "scan.error";
/// A session changed lifecycle state (scheduler tick or operator override).
pub const SESSION_STATUS: &str = "session.status";
/// A session's present/late tallies changed.
pub const ATTENDANCE_UPDATED: &str = "attendance.updated";

/// Wire envelope for all push events.
///
/// Consumers switch on `type` and must treat unknown values as ignorable,
/// so new event types can be added without breaking old dashboards.
#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    event_type: &'a str,
    payload: T,
}

/// Payload for `scan.ingested` and `scan.duplicate` events.
#[derive(Debug, Serialize)]
pub struct ScanPayload {
    pub session_id: uuid::Uuid,
    pub course_code: String,
    pub registration_no: String,
    pub student_name: String,
    pub status: AttendanceStatus,
    pub check_in_at: chrono::DateTime<chrono::Utc>,
}

/// Payload for `scan.error` events.
///
/// `reason` is the stable error code, not prose: dashboards map it to a
/// soft notification (`no_live_session`, `unknown_student`) or to a
/// configuration alert (`ambiguous_session`).
#[derive(Debug, Serialize)]
pub struct ScanErrorPayload {
    pub reason: &'static str,
    pub registration_no: String,
    pub device_name: String,
}

/// Payload for `session.status` events.
#[derive(Debug, Serialize)]
pub struct SessionStatusPayload {
    pub session_id: uuid::Uuid,
    pub course_code: String,
    pub status: SessionStatus,

    /// `"scheduler"` for clock-driven transitions, otherwise the operator
    /// who forced the change.
    pub changed_by: String,
}

/// Payload for `attendance.updated` events.
#[derive(Debug, Serialize)]
pub struct AttendanceUpdatedPayload {
    pub session_id: uuid::Uuid,
    pub present_count: i64,
    pub late_count: i64,
}

/// Fan-out handle shared by handlers and the scheduler.
///
/// All clones publish into, and subscribe to, the same channel. Events are
/// serialized once at publish time and delivered as JSON text frames.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<String>,
}

impl EventBroadcaster {
    /// Create a broadcaster with room for a short burst of undelivered events.
    ///
    /// If a subscriber falls behind by more than the channel capacity it
    /// receives a `Lagged` error and should re-fetch state over the read API.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Publish one event to all currently connected subscribers.
    ///
    /// Serialization failures and the no-subscribers case are both
    /// swallowed: delivery is best-effort and must never affect the
    /// operation that produced the event.
    pub fn publish<T: Serialize>(&self, event_type: &str, payload: T) {
        let envelope = Envelope {
            event_type,
            payload,
        };

        match serde_json::to_string(&envelope) {
            Ok(text) => {
                // send() only errors when there are no receivers
                let _ = self.sender.send(text);
            }
            Err(e) => {
                tracing::error!("Failed to serialize {event_type} event: {e}");
            }
        }
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    #[tokio::test]
    async fn it_delivers_to_all_subscribers() {
        let broadcaster = EventBroadcaster::new();

        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();

        broadcaster.publish(
            ATTENDANCE_UPDATED,
            AttendanceUpdatedPayload {
                session_id: uuid::Uuid::new_v4(),
                present_count: 12,
                late_count: 3,
            },
        );

        let msg1 = timeout(Duration::from_millis(50), first.recv())
            .await
            .unwrap()
            .unwrap();
        let msg2 = timeout(Duration::from_millis(50), second.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(msg1, msg2);
    }

    #[tokio::test]
    async fn envelope_carries_type_and_payload() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.publish(
            SCAN_ERROR,
            ScanErrorPayload {
                reason: "no_live_session",
                registration_no: "2019/ICTS/05".to_string(),
                device_name: "scanner-hall-b".to_string(),
            },
        );

        let text = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["type"], "scan.error");
        assert_eq!(value["payload"]["reason"], "no_live_session");
        assert_eq!(value["payload"]["registration_no"], "2019/ICTS/05");
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_a_no_op() {
        let broadcaster = EventBroadcaster::new();

        // Must not panic or error even though nobody is listening.
        broadcaster.publish(
            SESSION_STATUS,
            SessionStatusPayload {
                session_id: uuid::Uuid::new_v4(),
                course_code: "TICT 2233".to_string(),
                status: SessionStatus::Live,
                changed_by: "scheduler".to_string(),
            },
        );
    }
}

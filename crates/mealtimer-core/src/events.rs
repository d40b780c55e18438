use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every state change in the scheduling engine produces an Event.
/// Collaborators (presentation, notifications) consume these; the engine
/// has no further responsibility once an event is emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    MealStarted {
        meal_id: Uuid,
        at: DateTime<Utc>,
    },
    TimerStarted {
        timer_id: Uuid,
        meal_id: Uuid,
        name: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        timer_id: Uuid,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        timer_id: Uuid,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Drives full-screen alerts, repeating sound, and haptics downstream.
    TimerCompleted {
        timer_id: Uuid,
        meal_id: Uuid,
        name: String,
        at: DateTime<Utc>,
    },
    SessionStopped {
        meal_id: Uuid,
        at: DateTime<Utc>,
    },
}

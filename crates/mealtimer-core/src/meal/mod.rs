//! Meal and timer data model.
//!
//! A [`Meal`] owns an ordered collection of [`Timer`]s. Each timer carries
//! a [`TriggerRule`] that decides when it starts relative to the meal or to
//! another timer in the same meal. Trigger edges are weak references by id,
//! resolved through [`Meal::timer`] -- never owning pointers.
//!
//! Runtime fields (`status`, `started_at_epoch_ms`, `paused_remaining_secs`)
//! are owned by the scheduling engine once a cooking session begins; the
//! authoring surface only touches name, duration, and trigger rule.

mod estimate;

pub use estimate::{estimated_finish_offset, estimated_total_meal_time};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Live status of a timer during a cooking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Waiting,
    Running,
    Paused,
    /// Terminal. No transitions are defined out of this state.
    Completed,
}

/// The closed set of policies deciding when a timer starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TriggerRule {
    /// Started only by explicit user action.
    Manual,
    /// Started the instant the meal begins.
    WithMeal,
    /// Started `delay_secs` after the referenced timer starts running.
    AfterStart { of: Uuid, delay_secs: u64 },
    /// Started the instant the referenced timer completes.
    OnComplete { of: Uuid },
}

impl TriggerRule {
    /// The timer this rule depends on, if any.
    pub fn depends_on(&self) -> Option<Uuid> {
        match self {
            TriggerRule::Manual | TriggerRule::WithMeal => None,
            TriggerRule::AfterStart { of, .. } | TriggerRule::OnComplete { of } => Some(*of),
        }
    }
}

/// A single countdown with a fixed duration and a start-trigger rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    pub id: Uuid,
    pub name: String,
    /// Fixed duration in seconds, always >= 1.
    pub duration_secs: u64,
    pub trigger: TriggerRule,
    #[serde(default)]
    pub status: TimerStatus,
    /// Epoch milliseconds of the last (possibly reconstructed) start.
    /// Mutually exclusive with `paused_remaining_secs`.
    #[serde(default)]
    pub started_at_epoch_ms: Option<u64>,
    /// Remaining-seconds snapshot captured at the instant of pausing.
    #[serde(default)]
    pub paused_remaining_secs: Option<u64>,
}

impl Timer {
    /// Create a new timer in the `Waiting` state.
    ///
    /// # Errors
    /// Rejects empty names and durations below one second.
    pub fn new(
        name: impl Into<String>,
        duration_secs: u64,
        trigger: TriggerRule,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if duration_secs == 0 {
            return Err(ValidationError::NonPositiveDuration(duration_secs));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            duration_secs,
            trigger,
            status: TimerStatus::Waiting,
            started_at_epoch_ms: None,
            paused_remaining_secs: None,
        })
    }

    /// Remaining seconds at wall-clock `now_ms`, clamped to `0..=duration`.
    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        match self.status {
            TimerStatus::Waiting => self.duration_secs,
            TimerStatus::Paused => self
                .paused_remaining_secs
                .unwrap_or(self.duration_secs)
                .min(self.duration_secs),
            TimerStatus::Completed => 0,
            TimerStatus::Running => match self.started_at_epoch_ms {
                Some(start) => {
                    let elapsed_secs = now_ms.saturating_sub(start) / 1000;
                    self.duration_secs.saturating_sub(elapsed_secs)
                }
                None => self.duration_secs,
            },
        }
    }

    /// Reset runtime state back to `Waiting`.
    pub fn reset(&mut self) {
        self.status = TimerStatus::Waiting;
        self.started_at_epoch_ms = None;
        self.paused_remaining_secs = None;
    }
}

/// A named collection of timers representing one cooking session.
///
/// Insertion order is display order and also the order in which the
/// scheduling engine checks for completions within a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub timers: Vec<Timer>,
}

impl Meal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            timers: Vec::new(),
        }
    }

    /// Look up a timer by id within this meal.
    pub fn timer(&self, id: Uuid) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }

    pub fn timer_mut(&mut self, id: Uuid) -> Option<&mut Timer> {
        self.timers.iter_mut().find(|t| t.id == id)
    }

    /// Look up a timer by name (exact match), falling back to id prefix.
    pub fn timer_by_name(&self, needle: &str) -> Option<&Timer> {
        self.timers
            .iter()
            .find(|t| t.name == needle)
            .or_else(|| {
                self.timers
                    .iter()
                    .find(|t| t.id.to_string().starts_with(needle))
            })
    }

    pub fn add_timer(&mut self, timer: Timer) {
        self.timers.push(timer);
    }

    /// Remove a timer by id. Returns the removed timer, if present.
    ///
    /// Timers referencing the removed one are left alone; the scheduler
    /// treats their dangling trigger as absent and degrades gracefully.
    pub fn remove_timer(&mut self, id: Uuid) -> Option<Timer> {
        let idx = self.timers.iter().position(|t| t.id == id)?;
        Some(self.timers.remove(idx))
    }

    /// Authoring-time validation of the whole timer graph.
    ///
    /// Checks per-timer constraints plus same-meal trigger membership and
    /// direct self-references. Cycle detection across chains lives in the
    /// estimator ([`estimated_finish_offset`]).
    ///
    /// # Errors
    /// Returns the first violation found, in insertion order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for timer in &self.timers {
            if timer.name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if timer.duration_secs == 0 {
                return Err(ValidationError::NonPositiveDuration(timer.duration_secs));
            }
            if let Some(reference) = timer.trigger.depends_on() {
                if reference == timer.id {
                    return Err(ValidationError::SelfTrigger {
                        timer: timer.name.clone(),
                    });
                }
                if self.timer(reference).is_none() {
                    return Err(ValidationError::UnknownTriggerTimer {
                        timer: timer.name.clone(),
                        reference,
                    });
                }
            }
        }
        Ok(())
    }
}

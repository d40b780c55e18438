//! Scheduling engine implementation.
//!
//! The engine is a wall-clock-based state machine over a meal's timers. It
//! does not use internal threads - the caller is responsible for calling
//! `tick()` periodically (see [`session::drive`] for the async driver).
//!
//! ## State transitions per timer
//!
//! ```text
//! Waiting -> Running -> (Paused <-> Running) -> Completed
//! ```
//!
//! Starts cascade along trigger edges: a `with-meal` timer starts with the
//! meal; an `after-start` dependent gets a deferred one-shot start measured
//! from its trigger's actual start; an `on-complete` dependent starts
//! synchronously when its trigger completes. Deferred starts are re-checked
//! at fire time and become no-ops unless the timer is still `Waiting`.
//!
//! The engine exclusively owns the [`Meal`] for the duration of a session;
//! all mutations happen on the caller's single timeline.

mod clock;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};

use chrono::Utc;
use uuid::Uuid;

use crate::events::Event;
use crate::meal::{Meal, TimerStatus, TriggerRule};

/// A one-shot deferred start, keyed by timer id.
///
/// Never fired directly from a callback: drained on tick so teardown is a
/// plain clear and the still-Waiting re-check is the single liveness guard.
#[derive(Debug, Clone, Copy)]
struct PendingStart {
    timer_id: Uuid,
    fire_at_ms: u64,
}

/// Stateful runtime for one cooking session.
pub struct SchedulingEngine<C: Clock = SystemClock> {
    meal: Meal,
    clock: C,
    active: bool,
    pending_starts: Vec<PendingStart>,
}

impl SchedulingEngine<SystemClock> {
    /// Create an engine over `meal` using the real wall clock.
    pub fn new(meal: Meal) -> Self {
        Self::with_clock(meal, SystemClock)
    }
}

impl<C: Clock> SchedulingEngine<C> {
    pub fn with_clock(meal: Meal, clock: C) -> Self {
        Self {
            meal,
            clock,
            active: false,
            pending_starts: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn meal(&self) -> &Meal {
        &self.meal
    }

    /// Hand the meal back after the session (statuses as last recorded).
    pub fn into_meal(self) -> Meal {
        self.meal
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn status(&self, timer_id: Uuid) -> Option<TimerStatus> {
        self.meal.timer(timer_id).map(|t| t.status)
    }

    /// Remaining seconds for one timer at this instant. Collaborators poll
    /// this at their own refresh cadence.
    pub fn remaining_secs(&self, timer_id: Uuid) -> Option<u64> {
        let now = self.clock.now_ms();
        self.meal.timer(timer_id).map(|t| t.remaining_secs(now))
    }

    /// True when nothing is running and no deferred start is queued: the
    /// session cannot progress further without user action.
    pub fn is_idle(&self) -> bool {
        self.pending_starts.is_empty()
            && !self
                .meal
                .timers
                .iter()
                .any(|t| t.status == TimerStatus::Running)
    }

    pub fn all_completed(&self) -> bool {
        !self.meal.timers.is_empty()
            && self
                .meal
                .timers
                .iter()
                .all(|t| t.status == TimerStatus::Completed)
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Reset every timer to `Waiting` and drop any deferred starts.
    /// Idempotent; safe to call repeatedly.
    pub fn setup_session(&mut self) {
        for timer in &mut self.meal.timers {
            timer.reset();
        }
        self.pending_starts.clear();
        self.active = false;
    }

    /// Begin the session: start every waiting `with-meal` timer in meal
    /// order and evaluate cascades.
    pub fn start_meal(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        self.active = true;
        events.push(Event::MealStarted {
            meal_id: self.meal.id,
            at: Utc::now(),
        });
        let with_meal: Vec<Uuid> = self
            .meal
            .timers
            .iter()
            .filter(|t| t.status == TimerStatus::Waiting && t.trigger == TriggerRule::WithMeal)
            .map(|t| t.id)
            .collect();
        for id in with_meal {
            self.start_timer(id, &mut events);
        }
        self.fire_due_starts(&mut events);
        events
    }

    /// Explicit user action on one timer: pause it if running, resume it if
    /// paused, start it if still waiting (manual trigger or an ad-hoc early
    /// start). A completed or unknown timer is a no-op.
    pub fn toggle_pause(&mut self, timer_id: Uuid) -> Vec<Event> {
        let mut events = Vec::new();
        let now = self.clock.now_ms();
        let Some(timer) = self.meal.timer_mut(timer_id) else {
            return events;
        };
        match timer.status {
            TimerStatus::Running => {
                let remaining = timer.remaining_secs(now);
                timer.status = TimerStatus::Paused;
                timer.paused_remaining_secs = Some(remaining);
                timer.started_at_epoch_ms = None;
                events.push(Event::TimerPaused {
                    timer_id,
                    remaining_secs: remaining,
                    at: Utc::now(),
                });
            }
            TimerStatus::Paused => {
                let remaining = timer
                    .paused_remaining_secs
                    .unwrap_or(timer.duration_secs)
                    .min(timer.duration_secs);
                // Reconstruct a synthetic start so that
                // remaining = duration - elapsed matches the snapshot.
                let elapsed_ms = (timer.duration_secs - remaining).saturating_mul(1000);
                timer.status = TimerStatus::Running;
                timer.started_at_epoch_ms = Some(now.saturating_sub(elapsed_ms));
                timer.paused_remaining_secs = None;
                events.push(Event::TimerResumed {
                    timer_id,
                    remaining_secs: remaining,
                    at: Utc::now(),
                });
            }
            TimerStatus::Waiting => {
                self.start_timer(timer_id, &mut events);
                self.fire_due_starts(&mut events);
            }
            TimerStatus::Completed => {}
        }
        events
    }

    /// Halt the session. Recorded statuses are left untouched; all deferred
    /// starts are dropped.
    pub fn stop_session(&mut self) -> Vec<Event> {
        self.active = false;
        self.pending_starts.clear();
        vec![Event::SessionStopped {
            meal_id: self.meal.id,
            at: Utc::now(),
        }]
    }

    /// Call periodically while the session is active.
    ///
    /// Fires due deferred starts, then checks running timers for completion
    /// in meal order. Completions discovered in the same tick cascade in
    /// that order, so a diamond-shaped graph resolves deterministically.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.active {
            return events;
        }
        self.fire_due_starts(&mut events);
        let now = self.clock.now_ms();
        let ids: Vec<Uuid> = self.meal.timers.iter().map(|t| t.id).collect();
        for id in ids {
            let done = self
                .meal
                .timer(id)
                .is_some_and(|t| t.status == TimerStatus::Running && t.remaining_secs(now) == 0);
            if done {
                self.complete_timer(id, &mut events);
            }
        }
        // Cascaded starts may have queued zero-delay after-start entries.
        self.fire_due_starts(&mut events);
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Waiting -> Running. Records the start timestamp, emits the started
    /// event, and schedules deferred starts for after-start dependents.
    fn start_timer(&mut self, timer_id: Uuid, events: &mut Vec<Event>) {
        let now = self.clock.now_ms();
        let meal_id = self.meal.id;
        let Some(timer) = self.meal.timer_mut(timer_id) else {
            return;
        };
        if timer.status != TimerStatus::Waiting {
            return;
        }
        timer.status = TimerStatus::Running;
        timer.started_at_epoch_ms = Some(now);
        timer.paused_remaining_secs = None;
        events.push(Event::TimerStarted {
            timer_id,
            meal_id,
            name: timer.name.clone(),
            duration_secs: timer.duration_secs,
            at: Utc::now(),
        });
        self.schedule_after_start_dependents(timer_id, now);
    }

    /// Running -> Completed (terminal). Emits the completion event and
    /// synchronously starts waiting on-complete dependents, in meal order.
    fn complete_timer(&mut self, timer_id: Uuid, events: &mut Vec<Event>) {
        let meal_id = self.meal.id;
        let Some(timer) = self.meal.timer_mut(timer_id) else {
            return;
        };
        timer.status = TimerStatus::Completed;
        timer.started_at_epoch_ms = None;
        timer.paused_remaining_secs = None;
        events.push(Event::TimerCompleted {
            timer_id,
            meal_id,
            name: timer.name.clone(),
            at: Utc::now(),
        });
        let dependents: Vec<Uuid> = self
            .meal
            .timers
            .iter()
            .filter(|t| {
                t.status == TimerStatus::Waiting
                    && matches!(t.trigger, TriggerRule::OnComplete { of } if of == timer_id)
            })
            .map(|t| t.id)
            .collect();
        for id in dependents {
            self.start_timer(id, events);
        }
    }

    /// Queue one-shot starts for every waiting after-start dependent of the
    /// timer that just started, measured from its actual start instant.
    fn schedule_after_start_dependents(&mut self, started_id: Uuid, started_at_ms: u64) {
        let dependents: Vec<(Uuid, u64)> = self
            .meal
            .timers
            .iter()
            .filter(|t| t.status == TimerStatus::Waiting)
            .filter_map(|t| match t.trigger {
                TriggerRule::AfterStart { of, delay_secs } if of == started_id => {
                    Some((t.id, delay_secs))
                }
                _ => None,
            })
            .collect();
        for (timer_id, delay_secs) in dependents {
            self.pending_starts.push(PendingStart {
                timer_id,
                fire_at_ms: started_at_ms.saturating_add(delay_secs.saturating_mul(1000)),
            });
        }
    }

    /// Fire every due deferred start whose timer is still `Waiting`; due
    /// entries whose timer moved on in the interim are silently dropped.
    /// Loops because a fired start can queue further zero-delay entries.
    fn fire_due_starts(&mut self, events: &mut Vec<Event>) {
        loop {
            let now = self.clock.now_ms();
            let mut due = Vec::new();
            self.pending_starts.retain(|p| {
                if p.fire_at_ms <= now {
                    due.push(p.timer_id);
                    false
                } else {
                    true
                }
            });
            if due.is_empty() {
                return;
            }
            for timer_id in due {
                // start_timer re-checks Waiting.
                self.start_timer(timer_id, events);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal::{Timer, TriggerRule};

    const TICK_MS: u64 = 500;

    fn engine_with(timers: Vec<Timer>) -> (SchedulingEngine<ManualClock>, ManualClock) {
        let mut meal = Meal::new("Dinner");
        for t in timers {
            meal.add_timer(t);
        }
        let clock = ManualClock::new(1_000_000);
        let engine = SchedulingEngine::with_clock(meal, clock.clone());
        (engine, clock)
    }

    fn timer(name: &str, secs: u64, trigger: TriggerRule) -> Timer {
        Timer::new(name, secs, trigger).unwrap()
    }

    /// Advance the clock in scheduler-sized steps, collecting events.
    fn run_ticks(
        engine: &mut SchedulingEngine<ManualClock>,
        clock: &ManualClock,
        ticks: u64,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            clock.advance_ms(TICK_MS);
            events.extend(engine.tick());
        }
        events
    }

    #[test]
    fn setup_session_is_idempotent() {
        let (mut engine, _clock) = engine_with(vec![
            timer("Rice", 600, TriggerRule::WithMeal),
            timer("Naan", 120, TriggerRule::Manual),
        ]);
        engine.setup_session();
        let first: Vec<_> = engine.meal().timers.iter().map(|t| t.status).collect();
        engine.start_meal();
        engine.setup_session();
        engine.setup_session();
        let second: Vec<_> = engine.meal().timers.iter().map(|t| t.status).collect();
        assert_eq!(first, second);
        assert!(engine
            .meal()
            .timers
            .iter()
            .all(|t| t.status == TimerStatus::Waiting && t.started_at_epoch_ms.is_none()));
        assert!(!engine.is_active());
    }

    #[test]
    fn start_meal_starts_only_with_meal_timers() {
        let (mut engine, _clock) = engine_with(vec![
            timer("Rice", 600, TriggerRule::WithMeal),
            timer("Naan", 120, TriggerRule::Manual),
        ]);
        engine.setup_session();
        let events = engine.start_meal();
        let rice = engine.meal().timers[0].id;
        let naan = engine.meal().timers[1].id;
        assert_eq!(engine.status(rice), Some(TimerStatus::Running));
        assert_eq!(engine.status(naan), Some(TimerStatus::Waiting));
        assert!(matches!(events[0], Event::MealStarted { .. }));
        assert!(matches!(events[1], Event::TimerStarted { .. }));
    }

    #[test]
    fn pause_resume_round_trip_preserves_remaining() {
        let (mut engine, clock) = engine_with(vec![timer("Eggs", 120, TriggerRule::WithMeal)]);
        engine.setup_session();
        engine.start_meal();
        let id = engine.meal().timers[0].id;

        clock.advance_secs(50);
        let events = engine.toggle_pause(id);
        assert!(
            matches!(events[0], Event::TimerPaused { remaining_secs: 70, .. }),
            "expected snapshot of 70, got {events:?}"
        );

        // Time passing while paused must not erode the snapshot.
        clock.advance_secs(500);
        let events = engine.toggle_pause(id);
        assert!(matches!(
            events[0],
            Event::TimerResumed { remaining_secs: 70, .. }
        ));
        assert_eq!(engine.remaining_secs(id), Some(70));

        // The reconstructed start keeps counting down correctly.
        clock.advance_secs(70);
        let events = engine.tick();
        assert!(matches!(events[0], Event::TimerCompleted { .. }));
    }

    #[test]
    fn toggle_pause_on_waiting_starts_manually() {
        let (mut engine, _clock) = engine_with(vec![timer("Naan", 120, TriggerRule::Manual)]);
        engine.setup_session();
        engine.start_meal();
        let id = engine.meal().timers[0].id;
        let events = engine.toggle_pause(id);
        assert!(matches!(events[0], Event::TimerStarted { .. }));
        assert_eq!(engine.status(id), Some(TimerStatus::Running));
    }

    #[test]
    fn toggle_pause_on_completed_is_noop() {
        let (mut engine, clock) = engine_with(vec![timer("Toast", 1, TriggerRule::WithMeal)]);
        engine.setup_session();
        engine.start_meal();
        let id = engine.meal().timers[0].id;
        run_ticks(&mut engine, &clock, 3);
        assert_eq!(engine.status(id), Some(TimerStatus::Completed));
        assert!(engine.toggle_pause(id).is_empty());
        assert_eq!(engine.status(id), Some(TimerStatus::Completed));
    }

    #[test]
    fn on_complete_cascade_fires_on_completion_tick() {
        let (mut engine, clock) = engine_with(vec![
            timer("Blanch", 1, TriggerRule::WithMeal),
            timer("Saute", 300, TriggerRule::Manual),
        ]);
        let blanch = engine.meal().timers[0].id;
        let saute = engine.meal().timers[1].id;
        engine.meal.timer_mut(saute).unwrap().trigger = TriggerRule::OnComplete { of: blanch };
        engine.setup_session();
        engine.start_meal();

        // Duration shorter than the polling interval: completion and the
        // cascaded start land on the very next tick, never skipped.
        clock.advance_ms(TICK_MS * 2);
        let events = engine.tick();
        assert!(matches!(events[0], Event::TimerCompleted { .. }));
        assert!(matches!(events[1], Event::TimerStarted { .. }));
        assert_eq!(engine.status(saute), Some(TimerStatus::Running));
    }

    #[test]
    fn after_start_fires_after_delay_from_actual_start() {
        let (mut engine, clock) = engine_with(vec![
            timer("Roast", 3600, TriggerRule::WithMeal),
            timer("Potatoes", 2400, TriggerRule::Manual),
        ]);
        let roast = engine.meal().timers[0].id;
        let potatoes = engine.meal().timers[1].id;
        engine.meal.timer_mut(potatoes).unwrap().trigger = TriggerRule::AfterStart {
            of: roast,
            delay_secs: 10,
        };
        engine.setup_session();
        engine.start_meal();
        assert_eq!(engine.status(potatoes), Some(TimerStatus::Waiting));

        clock.advance_secs(9);
        assert!(engine.tick().is_empty());
        assert_eq!(engine.status(potatoes), Some(TimerStatus::Waiting));

        clock.advance_secs(1);
        let events = engine.tick();
        assert!(matches!(events[0], Event::TimerStarted { .. }));
        assert_eq!(engine.status(potatoes), Some(TimerStatus::Running));
    }

    #[test]
    fn deferred_start_is_noop_after_manual_start() {
        let (mut engine, clock) = engine_with(vec![
            timer("Roast", 3600, TriggerRule::WithMeal),
            timer("Potatoes", 2400, TriggerRule::Manual),
        ]);
        let roast = engine.meal().timers[0].id;
        let potatoes = engine.meal().timers[1].id;
        engine.meal.timer_mut(potatoes).unwrap().trigger = TriggerRule::AfterStart {
            of: roast,
            delay_secs: 60,
        };
        engine.setup_session();
        engine.start_meal();

        // User jumps the gun.
        clock.advance_secs(10);
        engine.toggle_pause(potatoes);
        let started_at = engine.meal().timer(potatoes).unwrap().started_at_epoch_ms;

        // The deferred start comes due but must not restart or disturb it.
        clock.advance_secs(60);
        let events = engine.tick();
        assert!(events.is_empty());
        assert_eq!(
            engine.meal().timer(potatoes).unwrap().started_at_epoch_ms,
            started_at
        );
    }

    #[test]
    fn stop_session_cancels_deferred_starts_and_keeps_statuses() {
        let (mut engine, clock) = engine_with(vec![
            timer("Roast", 3600, TriggerRule::WithMeal),
            timer("Potatoes", 2400, TriggerRule::Manual),
        ]);
        let roast = engine.meal().timers[0].id;
        let potatoes = engine.meal().timers[1].id;
        engine.meal.timer_mut(potatoes).unwrap().trigger = TriggerRule::AfterStart {
            of: roast,
            delay_secs: 5,
        };
        engine.setup_session();
        engine.start_meal();
        let events = engine.stop_session();
        assert!(matches!(events[0], Event::SessionStopped { .. }));
        assert_eq!(engine.status(roast), Some(TimerStatus::Running));

        // Tick is halted and the deferred start died with the session.
        clock.advance_secs(60);
        assert!(engine.tick().is_empty());
        assert_eq!(engine.status(potatoes), Some(TimerStatus::Waiting));
    }

    #[test]
    fn dangling_reference_stays_waiting_until_manual_start() {
        let ghost = Uuid::new_v4();
        let (mut engine, clock) = engine_with(vec![
            timer("Rice", 1, TriggerRule::WithMeal),
            timer("Orphan", 60, TriggerRule::OnComplete { of: ghost }),
        ]);
        let orphan = engine.meal().timers[1].id;
        engine.setup_session();
        engine.start_meal();
        run_ticks(&mut engine, &clock, 10);
        assert_eq!(engine.status(orphan), Some(TimerStatus::Waiting));

        let events = engine.toggle_pause(orphan);
        assert!(matches!(events[0], Event::TimerStarted { .. }));
    }

    #[test]
    fn same_tick_completions_cascade_in_meal_order() {
        // Diamond: A completes; B and C (both on-complete of A) start in
        // insertion order, then D waits on B.
        let (mut engine, clock) = engine_with(vec![
            timer("A", 1, TriggerRule::WithMeal),
            timer("B", 60, TriggerRule::Manual),
            timer("C", 60, TriggerRule::Manual),
            timer("D", 60, TriggerRule::Manual),
        ]);
        let a = engine.meal().timers[0].id;
        let b = engine.meal().timers[1].id;
        engine.meal.timer_mut(b).unwrap().trigger = TriggerRule::OnComplete { of: a };
        let c = engine.meal().timers[2].id;
        engine.meal.timer_mut(c).unwrap().trigger = TriggerRule::OnComplete { of: a };
        let d = engine.meal().timers[3].id;
        engine.meal.timer_mut(d).unwrap().trigger = TriggerRule::OnComplete { of: b };
        engine.setup_session();
        engine.start_meal();

        let events = run_ticks(&mut engine, &clock, 3);
        let started: Vec<Uuid> = events
            .iter()
            .filter_map(|e| match e {
                Event::TimerStarted { timer_id, .. } => Some(*timer_id),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![b, c]);
    }

    #[test]
    fn pausing_one_timer_leaves_other_cascades_alone() {
        let (mut engine, clock) = engine_with(vec![
            timer("Roast", 2, TriggerRule::WithMeal),
            timer("Side", 30, TriggerRule::Manual),
            timer("Gravy", 60, TriggerRule::Manual),
        ]);
        let roast = engine.meal().timers[0].id;
        let side = engine.meal().timers[1].id;
        let gravy = engine.meal().timers[2].id;
        engine.meal.timer_mut(gravy).unwrap().trigger = TriggerRule::OnComplete { of: roast };
        engine.setup_session();
        engine.start_meal();
        engine.toggle_pause(side); // manual start
        engine.toggle_pause(side); // pause it

        run_ticks(&mut engine, &clock, 5);
        assert_eq!(engine.status(roast), Some(TimerStatus::Completed));
        assert_eq!(engine.status(gravy), Some(TimerStatus::Running));
        assert_eq!(engine.status(side), Some(TimerStatus::Paused));
    }

    #[test]
    fn tick_is_inert_before_start_and_after_stop() {
        let (mut engine, clock) = engine_with(vec![timer("Rice", 1, TriggerRule::WithMeal)]);
        engine.setup_session();
        clock.advance_secs(100);
        assert!(engine.tick().is_empty());
        engine.start_meal();
        engine.stop_session();
        clock.advance_secs(100);
        assert!(engine.tick().is_empty());
    }

    #[test]
    fn all_completed_tracks_terminal_state() {
        let (mut engine, clock) = engine_with(vec![
            timer("A", 1, TriggerRule::WithMeal),
            timer("B", 1, TriggerRule::WithMeal),
        ]);
        engine.setup_session();
        engine.start_meal();
        assert!(!engine.all_completed());
        run_ticks(&mut engine, &clock, 3);
        assert!(engine.all_completed());
    }
}

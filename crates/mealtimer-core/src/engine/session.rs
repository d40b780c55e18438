//! Async driver for the scheduling engine.
//!
//! The engine itself is tick-driven and thread-free; this module owns the
//! recurring tick on a tokio interval. Everything runs on the caller's
//! task, so all mutations to the meal stay on one sequential timeline.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::engine::{Clock, SchedulingEngine};
use crate::events::Event;

/// Default state-advance interval. Presentation layers redraw on their own
/// finer cadence by polling `remaining_secs`.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Drive an active session to completion, forwarding events to `on_event`.
///
/// Returns when every timer has completed, the session is no longer active
/// (e.g. `stop_session` was called from `on_event`), or the engine goes
/// idle -- nothing running and no deferred start queued, so only a user
/// action could move it forward. Dropping the future cancels the tick;
/// deferred starts never outlive the engine.
pub async fn drive<C: Clock>(
    engine: &mut SchedulingEngine<C>,
    tick_interval: Duration,
    mut on_event: impl FnMut(Event),
) {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first interval tick fires immediately; skip it so the meal gets
    // a full interval before the first completion check.
    interval.tick().await;
    loop {
        interval.tick().await;
        for event in engine.tick() {
            on_event(event);
        }
        if engine.all_completed() || !engine.is_active() || engine.is_idle() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal::{Meal, Timer, TriggerRule};

    #[tokio::test(start_paused = true)]
    async fn drive_returns_when_session_stops() {
        let mut meal = Meal::new("Dinner");
        meal.add_timer(Timer::new("Stew", 3600, TriggerRule::WithMeal).unwrap());
        let mut engine = SchedulingEngine::new(meal);
        engine.setup_session();
        engine.start_meal();
        engine.stop_session();

        // Inactive session: the driver exits on its first tick.
        let mut events = Vec::new();
        drive(&mut engine, TICK_INTERVAL, |e| events.push(e)).await;
        assert!(events.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drive_exits_when_only_manual_work_remains() {
        let mut meal = Meal::new("Dinner");
        meal.add_timer(Timer::new("Bread", 600, TriggerRule::Manual).unwrap());
        let mut engine = SchedulingEngine::new(meal);
        engine.setup_session();
        engine.start_meal();

        // Nothing is running and nothing is deferred; the driver must not
        // spin forever waiting for a manual start.
        drive(&mut engine, TICK_INTERVAL, |_| {}).await;
        assert!(engine.is_active());
    }
}

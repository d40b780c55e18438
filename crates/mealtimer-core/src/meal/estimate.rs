//! Pure finish-offset estimation over the timer dependency graph.
//!
//! Answers "at what offset from meal-start does timer T finish?" without
//! touching any runtime state, so it is safely callable at any time --
//! before, during, or after a cooking session.
//!
//! Known quirk, kept deliberately: `after-start` offsets are measured from
//! meal-start under the assumption that the trigger timer itself starts at
//! meal-start. The estimator does not recurse into the trigger's own
//! offset for that rule, while the runtime cascade measures the delay from
//! the trigger's actual start event. `on-complete` offsets do recurse.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::EstimateError;

use super::{Meal, Timer, TriggerRule};

/// Wall-clock offset in seconds, from meal-start, at which `timer` is
/// expected to finish.
///
/// Dangling trigger references degrade to the timer's own duration.
///
/// # Errors
/// Fails with [`EstimateError::CyclicDependency`] if the `on-complete`
/// chain revisits a timer.
pub fn estimated_finish_offset(meal: &Meal, timer: &Timer) -> Result<u64, EstimateError> {
    let mut visited = HashSet::new();
    finish_offset(meal, timer, &mut visited)
}

/// Total duration of the meal: the maximum finish offset over all timers.
/// An empty meal yields 0.
///
/// # Errors
/// Fails with [`EstimateError::CyclicDependency`] if any timer's chain
/// contains a cycle.
pub fn estimated_total_meal_time(meal: &Meal) -> Result<u64, EstimateError> {
    let mut total = 0;
    for timer in &meal.timers {
        total = total.max(estimated_finish_offset(meal, timer)?);
    }
    Ok(total)
}

fn finish_offset(
    meal: &Meal,
    timer: &Timer,
    visited: &mut HashSet<Uuid>,
) -> Result<u64, EstimateError> {
    if !visited.insert(timer.id) {
        return Err(EstimateError::CyclicDependency { timer: timer.id });
    }
    match timer.trigger {
        TriggerRule::Manual | TriggerRule::WithMeal => Ok(timer.duration_secs),
        TriggerRule::AfterStart { of, delay_secs } => match meal.timer(of) {
            // Measured from meal-start; the trigger's own offset is not
            // consulted for this rule.
            Some(_) => Ok(delay_secs.saturating_add(timer.duration_secs)),
            None => Ok(timer.duration_secs),
        },
        TriggerRule::OnComplete { of } => match meal.timer(of) {
            Some(trigger) => Ok(finish_offset(meal, trigger, visited)?
                .saturating_add(timer.duration_secs)),
            None => Ok(timer.duration_secs),
        },
    }
}

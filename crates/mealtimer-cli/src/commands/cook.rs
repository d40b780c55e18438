//! Run a cooking session, streaming engine events as JSON lines.
//!
//! The session ends when every timer has completed. Interactive control
//! (pause/resume/manual starts) belongs to richer front ends; this command
//! is the minimal presentation collaborator.

use mealtimer_core::engine::session;
use mealtimer_core::{Config, MealDb, SchedulingEngine};

pub fn run(meal: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = MealDb::open()?;
    let meal = db.find_meal(meal)?;
    if meal.timers.is_empty() {
        return Err(format!("meal '{}' has no timers", meal.name).into());
    }
    meal.validate()?;
    let config = Config::load()?;

    let mut engine = SchedulingEngine::new(meal);
    engine.setup_session();
    for event in engine.start_meal() {
        print_event(&event);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(session::drive(
        &mut engine,
        config.tick_interval(),
        |event| print_event(&event),
    ));

    for event in engine.stop_session() {
        print_event(&event);
    }
    Ok(())
}

fn print_event(event: &mealtimer_core::Event) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("event serialization failed: {e}"),
    }
}

use clap::Subcommand;
use mealtimer_core::{Meal, MealDb, Timer, TriggerRule};

#[derive(Subcommand)]
pub enum MealAction {
    /// Create a new meal
    Add {
        /// Meal name
        name: String,
    },
    /// List all meals
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a meal with its timers
    Show {
        /// Meal name or id prefix
        meal: String,
    },
    /// Delete a meal and its timers
    Remove {
        /// Meal name or id prefix
        meal: String,
    },
    /// Add a timer to a meal
    AddTimer {
        /// Meal name or id prefix
        meal: String,
        /// Timer name
        name: String,
        /// Duration in seconds
        #[arg(long)]
        duration: u64,
        /// Start the instant the meal begins
        #[arg(long, conflicts_with_all = ["after_start", "on_complete"])]
        with_meal: bool,
        /// Start N seconds after the named timer starts (requires --delay)
        #[arg(long, value_name = "TIMER", conflicts_with = "on_complete")]
        after_start: Option<String>,
        /// Delay in seconds for --after-start
        #[arg(long, default_value = "0")]
        delay: u64,
        /// Start when the named timer completes
        #[arg(long, value_name = "TIMER")]
        on_complete: Option<String>,
    },
    /// Remove a timer from a meal
    RemoveTimer {
        /// Meal name or id prefix
        meal: String,
        /// Timer name or id prefix
        timer: String,
    },
}

pub fn run(action: MealAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = MealDb::open()?;
    match action {
        MealAction::Add { name } => {
            let meal = Meal::new(name);
            db.insert_meal(&meal)?;
            println!("Meal created: {} ({})", meal.name, meal.id);
        }
        MealAction::List { json } => {
            let meals = db.list_meals()?;
            if json {
                let rows: Vec<serde_json::Value> = meals
                    .iter()
                    .map(|(id, name, created_at)| {
                        serde_json::json!({
                            "id": id,
                            "name": name,
                            "created_at": created_at,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for (id, name, created_at) in meals {
                    println!("{id}  {name}  (created {created_at})");
                }
            }
        }
        MealAction::Show { meal } => {
            let meal = db.find_meal(&meal)?;
            println!("{}", serde_json::to_string_pretty(&meal)?);
        }
        MealAction::Remove { meal } => {
            let meal = db.find_meal(&meal)?;
            db.delete_meal(meal.id)?;
            println!("Meal removed: {}", meal.name);
        }
        MealAction::AddTimer {
            meal,
            name,
            duration,
            with_meal,
            after_start,
            delay,
            on_complete,
        } => {
            let mut meal = db.find_meal(&meal)?;
            let trigger = resolve_trigger(&meal, with_meal, after_start, delay, on_complete)?;
            let timer = Timer::new(name, duration, trigger)?;
            let (timer_name, timer_id) = (timer.name.clone(), timer.id);
            meal.add_timer(timer);
            db.update_meal(&meal)?;
            println!("Timer added: {timer_name} ({timer_id})");
        }
        MealAction::RemoveTimer { meal, timer } => {
            let mut meal = db.find_meal(&meal)?;
            let id = meal
                .timer_by_name(&timer)
                .map(|t| t.id)
                .ok_or_else(|| format!("no timer named '{timer}' in meal '{}'", meal.name))?;
            meal.remove_timer(id);
            db.update_meal(&meal)?;
            println!("Timer removed: {timer}");
        }
    }
    Ok(())
}

fn resolve_trigger(
    meal: &Meal,
    with_meal: bool,
    after_start: Option<String>,
    delay: u64,
    on_complete: Option<String>,
) -> Result<TriggerRule, Box<dyn std::error::Error>> {
    if with_meal {
        return Ok(TriggerRule::WithMeal);
    }
    if let Some(needle) = after_start {
        let of = lookup(meal, &needle)?;
        return Ok(TriggerRule::AfterStart {
            of,
            delay_secs: delay,
        });
    }
    if let Some(needle) = on_complete {
        let of = lookup(meal, &needle)?;
        return Ok(TriggerRule::OnComplete { of });
    }
    Ok(TriggerRule::Manual)
}

fn lookup(meal: &Meal, needle: &str) -> Result<uuid::Uuid, Box<dyn std::error::Error>> {
    meal.timer_by_name(needle)
        .map(|t| t.id)
        .ok_or_else(|| format!("no timer named '{needle}' in meal '{}'", meal.name).into())
}

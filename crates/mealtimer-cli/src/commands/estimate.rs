use mealtimer_core::{estimated_finish_offset, estimated_total_meal_time, MealDb};

pub fn run(meal: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = MealDb::open()?;
    let meal = db.find_meal(meal)?;

    let mut offsets = Vec::with_capacity(meal.timers.len());
    for timer in &meal.timers {
        offsets.push((timer, estimated_finish_offset(&meal, timer)?));
    }
    let total = estimated_total_meal_time(&meal)?;

    if json {
        let rows: Vec<serde_json::Value> = offsets
            .iter()
            .map(|(timer, offset)| {
                serde_json::json!({
                    "id": timer.id,
                    "name": timer.name,
                    "duration_secs": timer.duration_secs,
                    "finish_offset_secs": offset,
                })
            })
            .collect();
        let out = serde_json::json!({
            "meal": meal.name,
            "timers": rows,
            "total_secs": total,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Meal: {}", meal.name);
        for (timer, offset) in &offsets {
            println!(
                "  {:<24} {:>6}s  finishes at +{}",
                timer.name,
                timer.duration_secs,
                fmt_secs(*offset)
            );
        }
        println!("Total meal time: {}", fmt_secs(total));
    }
    Ok(())
}

fn fmt_secs(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

mod config;
pub mod meal_db;

pub use config::Config;
pub use meal_db::MealDb;

use std::path::PathBuf;

/// Returns `~/.config/mealtimer[-dev]/` based on MEALTIMER_ENV.
///
/// Set MEALTIMER_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MEALTIMER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mealtimer-dev")
    } else {
        base_dir.join("mealtimer")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

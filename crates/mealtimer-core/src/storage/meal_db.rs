//! SQLite-based meal and timer storage.
//!
//! The persistence collaborator: the scheduling engine reads the initial
//! graph from here and never writes runtime state back mid-session. Only
//! authoring fields (name, duration, trigger) are persisted; `status` and
//! the start/pause bookkeeping always load as fresh `Waiting` state.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::meal::{Meal, Timer, TriggerRule};

use super::data_dir;

/// SQLite database for meals and their timer graphs.
pub struct MealDb {
    conn: Connection,
}

impl MealDb {
    /// Open the database at `~/.config/mealtimer/mealtimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .join("mealtimer.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meals (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS timers (
                id            TEXT PRIMARY KEY,
                meal_id       TEXT NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
                name          TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                trigger       TEXT NOT NULL,
                position      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_timers_meal_id ON timers(meal_id);",
        )?;
        Ok(())
    }

    /// Insert a meal and its timers. The meal graph is validated first.
    ///
    /// # Errors
    /// Returns an error if validation or any insert fails.
    pub fn insert_meal(&self, meal: &Meal) -> Result<()> {
        meal.validate()?;
        self.conn.execute(
            "INSERT INTO meals (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                meal.id.to_string(),
                meal.name,
                meal.created_at.to_rfc3339()
            ],
        )?;
        for (position, timer) in meal.timers.iter().enumerate() {
            self.insert_timer_row(meal.id, timer, position as i64)?;
        }
        Ok(())
    }

    /// Replace a meal's stored timers with its current set.
    ///
    /// # Errors
    /// Returns an error if validation or any statement fails.
    pub fn update_meal(&self, meal: &Meal) -> Result<()> {
        meal.validate()?;
        self.conn.execute(
            "UPDATE meals SET name = ?2 WHERE id = ?1",
            params![meal.id.to_string(), meal.name],
        )?;
        self.conn.execute(
            "DELETE FROM timers WHERE meal_id = ?1",
            params![meal.id.to_string()],
        )?;
        for (position, timer) in meal.timers.iter().enumerate() {
            self.insert_timer_row(meal.id, timer, position as i64)?;
        }
        Ok(())
    }

    fn insert_timer_row(&self, meal_id: Uuid, timer: &Timer, position: i64) -> Result<()> {
        let trigger_json = serde_json::to_string(&timer.trigger)?;
        self.conn.execute(
            "INSERT INTO timers (id, meal_id, name, duration_secs, trigger, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timer.id.to_string(),
                meal_id.to_string(),
                timer.name,
                timer.duration_secs,
                trigger_json,
                position,
            ],
        )?;
        Ok(())
    }

    /// Load a meal with its timers in insertion order.
    ///
    /// # Errors
    /// Returns [`DatabaseError::MealNotFound`] for an unknown id.
    pub fn get_meal(&self, id: Uuid) -> Result<Meal> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, created_at FROM meals WHERE id = ?1")?;
        let row = stmt.query_row(params![id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        });
        let (name, created_at) = match row {
            Ok(v) => v,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(DatabaseError::MealNotFound(id).into())
            }
            Err(e) => return Err(e.into()),
        };
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let mut meal = Meal {
            id,
            name,
            created_at,
            timers: Vec::new(),
        };
        let mut stmt = self.conn.prepare(
            "SELECT id, name, duration_secs, trigger FROM timers
             WHERE meal_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for row in rows {
            let (timer_id, name, duration_secs, trigger_json) = row?;
            let timer_id = Uuid::parse_str(&timer_id)
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            let trigger: TriggerRule = serde_json::from_str(&trigger_json)?;
            let mut timer = Timer::new(name, duration_secs, trigger)?;
            timer.id = timer_id;
            meal.add_timer(timer);
        }
        Ok(meal)
    }

    /// List all meals (without their timers), newest first.
    pub fn list_meals(&self) -> Result<Vec<(Uuid, String, DateTime<Utc>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM meals ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut meals = Vec::new();
        for row in rows {
            let (id, name, created_at) = row?;
            let id =
                Uuid::parse_str(&id).map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            meals.push((id, name, created_at));
        }
        Ok(meals)
    }

    /// Delete a meal and its timers.
    pub fn delete_meal(&self, id: Uuid) -> Result<()> {
        // ON DELETE CASCADE needs foreign keys enabled per connection;
        // delete timers explicitly instead.
        self.conn.execute(
            "DELETE FROM timers WHERE meal_id = ?1",
            params![id.to_string()],
        )?;
        self.conn
            .execute("DELETE FROM meals WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    /// Resolve a meal by exact name or id prefix.
    pub fn find_meal(&self, needle: &str) -> Result<Meal> {
        for (id, name, _) in self.list_meals()? {
            if name == needle || id.to_string().starts_with(needle) {
                return self.get_meal(id);
            }
        }
        Err(DatabaseError::MealNotFound(Uuid::nil()).into())
    }
}

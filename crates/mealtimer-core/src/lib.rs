//! # Mealtimer Core Library
//!
//! Core business logic for Mealtimer: coordinating multiple countdown
//! timers so several dishes finish cooking at predictable, often
//! simultaneous, moments. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Dependency Model**: a meal's timers form a directed dependency graph
//!   via id-based trigger rules; a pure estimator computes finish offsets
//!   and total meal time by walking trigger chains
//! - **Scheduling Engine**: a wall-clock-based state machine per timer that
//!   requires the caller to periodically invoke `tick()`, cascading starts
//!   along dependency edges
//! - **Storage**: SQLite-based meal storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SchedulingEngine`]: per-session timer state machine and cascades
//! - [`estimated_finish_offset`] / [`estimated_total_meal_time`]: the pure
//!   dependency model
//! - [`MealDb`]: meal and timer persistence
//! - [`Config`]: application configuration management

pub mod engine;
pub mod error;
pub mod events;
pub mod meal;
pub mod storage;

pub use engine::{Clock, ManualClock, SchedulingEngine, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, EstimateError, ValidationError};
pub use events::Event;
pub use meal::{
    estimated_finish_offset, estimated_total_meal_time, Meal, Timer, TimerStatus, TriggerRule,
};
pub use storage::{Config, MealDb};

pub mod config;
pub mod cook;
pub mod estimate;
pub mod meal;

//! Data layer module
//!
//! Handles all data persistence and caching:
//! - SQLite database operations
//! - Strategy store (volatile)

mod cache;
mod database;
mod models;

pub use cache::{HOT_KEY_WINDOW, StrategyStore, glob_match};
pub use database::Database;
pub use models::*;

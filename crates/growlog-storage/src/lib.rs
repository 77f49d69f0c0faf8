//! SQLite persistence for Growlog.

pub mod db;
pub mod migrations;
pub mod queries;
pub mod repository;

pub use db::Database;
pub use queries::{QueryService, MAX_RANGE_DAYS};
pub use repository::{
    EmotionRepository, ReflectionRepository, TodoRepository, UserRecord, UserRepository,
};

//! Database module for persistent storage
//! Uses SQLite via sqlx for the local watch history

mod models;
mod ops;
mod repository;
mod schema;

pub use models::*;
pub use repository::Database;

//! Database operations organized by entity type

mod watch_history;

pub use watch_history::*;

//! Feature modules - state containers and configuration shared by the player
//!
//! Features should not depend on the player session directly.

pub mod id_set;
pub mod likes;
pub mod settings;
pub mod show_session;
pub mod watch_history;

pub use id_set::{IdSnapshot, SharedIdSet};
pub use likes::Likes;
pub use settings::{
    ApiSettings, ControlsSettings, GestureSettings, PlaybackSettings, Settings, SettingsError,
    StorageSettings,
};
pub use show_session::ShowSession;
pub use watch_history::{WatchHistory, WatchHistoryPersistence, WatchedSnapshot};

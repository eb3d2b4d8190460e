//! Reelswipe - playback engine for a vertically swipeable episode feed
//!
//! The crate is headless: hosts plug their video surfaces in through
//! [`player::VideoSurface`] and feed gestures, frames and player
//! notifications into a [`player::SessionHandle`].

pub mod api;
pub mod database;
pub mod features;
pub mod player;
pub mod utils;

pub mod config;
pub mod mpd;
pub mod platform;
pub mod protocol;
